// src/web/lookup_handlers.rs
//! Listas em JSON para os `<select>` do assistente.
//!
//! Uma falha do backend nunca parte a página: responde-se `[]` e o erro
//! fica como toast para a próxima renderização.

use crate::{
    error::{AppResult, BackendResult},
    models::{
        catalog::{ClassOption, Room, Teacher},
        notice::Notice,
    },
    services::backend::Backend,
    state::AppState,
    web::wizard_session::push_notice,
};
use axum::{
    extract::{Path, State},
    Json,
};
use tower_sessions::Session;

async fn list_or_empty<T>(session: &Session, result: BackendResult<Vec<T>>, what: &str) -> AppResult<Json<Vec<T>>> {
    match result {
        Ok(items) => {
            tracing::debug!("{} {} carregados", items.len(), what);
            Ok(Json(items))
        }
        Err(e) => {
            tracing::warn!("Falha ao carregar {}: {}", what, e);
            push_notice(session, Notice::error(format!("Could not load {}.", what))).await?;
            Ok(Json(Vec::new()))
        }
    }
}

// GET /api/courses/{id}/teachers
pub async fn course_teachers(
    State(state): State<AppState>,
    session: Session,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<Teacher>>> {
    let result = state.backend.teachers_by_course(course_id).await;
    list_or_empty(&session, result, "teachers").await
}

// GET /api/rooms
pub async fn rooms(State(state): State<AppState>, session: Session) -> AppResult<Json<Vec<Room>>> {
    let result = state.backend.rooms().await;
    list_or_empty(&session, result, "rooms").await
}

// GET /api/class-options
pub async fn class_options(State(state): State<AppState>, session: Session) -> AppResult<Json<Vec<ClassOption>>> {
    let result = state.backend.class_options().await;
    list_or_empty(&session, result, "class types").await
}
