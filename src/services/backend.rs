// src/services/backend.rs
//! Cliente do backend REST da escola.
//!
//! O backend é dono da persistência e da deteção de conflitos; aqui só
//! existem as formas dos pedidos e respostas.

use crate::{
    config::AppConfig,
    error::{BackendError, BackendResult},
    models::{
        catalog::{ClassOption, Course, ExistingSession, Package, Room, Student, Teacher},
        conflict::{ConflictBatchRequest, ConflictCheckRequest, ConflictDetail},
        schedule::{BulkCreated, CreatedSession, NewSchedule, NewSession, SessionUpdate},
    },
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;

/// Chamadas ao backend de que o assistente precisa.
pub trait Backend: Send + Sync {
    fn course(&self, course_id: i64) -> impl Future<Output = BackendResult<Course>> + Send;

    fn student(&self, student_id: &str) -> impl Future<Output = BackendResult<Student>> + Send;

    fn package(&self, package_id: i64) -> impl Future<Output = BackendResult<Package>> + Send;

    fn session(&self, session_id: i64) -> impl Future<Output = BackendResult<ExistingSession>> + Send;

    fn teachers_by_course(&self, course_id: i64) -> impl Future<Output = BackendResult<Vec<Teacher>>> + Send;

    fn rooms(&self) -> impl Future<Output = BackendResult<Vec<Room>>> + Send;

    fn class_options(&self) -> impl Future<Output = BackendResult<Vec<ClassOption>>> + Send;

    /// `POST schedules/conflict`: `None` quando não há conflito.
    fn check_conflict(
        &self,
        request: &ConflictCheckRequest,
    ) -> impl Future<Output = BackendResult<Option<ConflictDetail>>> + Send;

    /// `POST schedules/conflicts`: um único pedido para todas as linhas.
    fn check_conflicts(
        &self,
        request: &ConflictBatchRequest,
    ) -> impl Future<Output = BackendResult<Vec<ConflictDetail>>> + Send;

    fn create_session(&self, session: &NewSession) -> impl Future<Output = BackendResult<CreatedSession>> + Send;

    fn update_session(
        &self,
        session_id: i64,
        update: &SessionUpdate,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    fn create_schedules(&self, schedules: &[NewSchedule]) -> impl Future<Output = BackendResult<BulkCreated>> + Send;

    fn apply_package(&self, package_id: i64, course_id: i64) -> impl Future<Output = BackendResult<()>> + Send;
}

/// Implementação HTTP (reqwest + JSON).
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.backend_url.clone(),
            token: config.backend_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Envia o pedido e devolve o corpo, ou erro se o status não for 2xx.
    async fn send(&self, request: reqwest::RequestBuilder) -> BackendResult<String> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!("Backend respondeu {}: {}", status, body);
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        tracing::debug!("-> GET {}", path);
        let body = self.send(self.http.get(self.url(path))).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<T, B>(&self, path: &str, payload: &B) -> BackendResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        tracing::debug!("-> POST {}", path);
        let body = self.send(self.http.post(self.url(path)).json(payload)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Para endpoints cuja resposta não interessa.
    async fn send_ignoring_body(&self, request: reqwest::RequestBuilder) -> BackendResult<()> {
        self.send(request).await.map(|_| ())
    }
}

impl Backend for HttpBackend {
    async fn course(&self, course_id: i64) -> BackendResult<Course> {
        self.get_json(&format!("courses/{}", course_id)).await
    }

    async fn student(&self, student_id: &str) -> BackendResult<Student> {
        self.get_json(&format!("students/{}", urlencoding::encode(student_id))).await
    }

    async fn package(&self, package_id: i64) -> BackendResult<Package> {
        self.get_json(&format!("packages/{}", package_id)).await
    }

    async fn session(&self, session_id: i64) -> BackendResult<ExistingSession> {
        self.get_json(&format!("sessions/{}", session_id)).await
    }

    async fn teachers_by_course(&self, course_id: i64) -> BackendResult<Vec<Teacher>> {
        self.get_json(&format!("courses/{}/teachers", course_id)).await
    }

    async fn rooms(&self) -> BackendResult<Vec<Room>> {
        self.get_json("rooms").await
    }

    async fn class_options(&self) -> BackendResult<Vec<ClassOption>> {
        self.get_json("class-options").await
    }

    async fn check_conflict(&self, request: &ConflictCheckRequest) -> BackendResult<Option<ConflictDetail>> {
        tracing::debug!("-> POST schedules/conflict ({} {})", request.date, request.room);
        let body = self.send(self.http.post(self.url("schedules/conflict")).json(request)).await?;
        decode_optional_conflict(&body)
    }

    async fn check_conflicts(&self, request: &ConflictBatchRequest) -> BackendResult<Vec<ConflictDetail>> {
        self.post_json("schedules/conflicts", request).await
    }

    async fn create_session(&self, session: &NewSession) -> BackendResult<CreatedSession> {
        self.post_json("sessions", session).await
    }

    async fn update_session(&self, session_id: i64, update: &SessionUpdate) -> BackendResult<()> {
        tracing::debug!("-> PATCH sessions/{}", session_id);
        let request = self.http.patch(self.url(&format!("sessions/{}", session_id))).json(update);
        self.send_ignoring_body(request).await
    }

    async fn create_schedules(&self, schedules: &[NewSchedule]) -> BackendResult<BulkCreated> {
        self.post_json("schedules/bulk", schedules).await
    }

    async fn apply_package(&self, package_id: i64, course_id: i64) -> BackendResult<()> {
        tracing::debug!("-> POST packages/{}/apply", package_id);
        let request = self
            .http
            .post(self.url(&format!("packages/{}/apply", package_id)))
            .json(&serde_json::json!({ "courseId": course_id }));
        self.send_ignoring_body(request).await
    }
}

/// O endpoint de linha única responde com o conflito ou com algo "falsy".
pub(crate) fn decode_optional_conflict(body: &str) -> BackendResult<Option<ConflictDetail>> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(body)?;
    match &value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(None),
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        _ => Ok(Some(serde_json::from_value(value)?)),
    }
}
