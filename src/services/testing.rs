// src/services/testing.rs
//! Backend em memória para os testes: responde com dados fixos e regista as chamadas.

use crate::{
    error::{BackendError, BackendResult},
    models::{
        catalog::{ClassOption, Course, ExistingSession, Package, Room, Student, Teacher},
        conflict::{ConflictBatchRequest, ConflictCheckRequest, ConflictDetail},
        schedule::{parse_clock, BulkCreated, CreatedSession, NewSchedule, NewSession, SessionUpdate, TimeRange},
    },
    services::backend::Backend,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CheckConflict(ConflictCheckRequest),
    CheckConflicts(ConflictBatchRequest),
    CreateSession(NewSession),
    UpdateSession(i64, SessionUpdate),
    CreateSchedules(Vec<NewSchedule>),
    ApplyPackage(i64, i64),
}

#[derive(Default)]
pub struct MockBackend {
    pub courses: Vec<Course>,
    pub students: Vec<Student>,
    pub packages: Vec<Package>,
    pub sessions: Vec<ExistingSession>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    pub class_options: Vec<ClassOption>,
    pub conflicts: Vec<ConflictDetail>,
    pub fail_conflict_checks: AtomicBool,
    pub fail_lookups: AtomicBool,
    pub fail_bulk: AtomicBool,
    /// aluno cuja criação de sessão falha
    pub fail_session_for: Mutex<Option<String>>,
    pub calls: Mutex<Vec<Call>>,
}

pub fn boom() -> BackendError {
    BackendError::Status { status: 500, body: "boom".into() }
}

fn not_found(what: &str) -> BackendError {
    BackendError::Status { status: 404, body: format!("{} not found", what) }
}

impl MockBackend {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookups_fail(&self) -> bool {
        self.fail_lookups.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    async fn course(&self, course_id: i64) -> BackendResult<Course> {
        self.courses.iter().find(|c| c.id == course_id).cloned().ok_or_else(|| not_found("course"))
    }

    async fn student(&self, student_id: &str) -> BackendResult<Student> {
        self.students.iter().find(|s| s.id == student_id).cloned().ok_or_else(|| not_found("student"))
    }

    async fn package(&self, package_id: i64) -> BackendResult<Package> {
        self.packages.iter().find(|p| p.id == package_id).cloned().ok_or_else(|| not_found("package"))
    }

    async fn session(&self, session_id: i64) -> BackendResult<ExistingSession> {
        self.sessions.iter().find(|s| s.id == session_id).cloned().ok_or_else(|| not_found("session"))
    }

    async fn teachers_by_course(&self, _course_id: i64) -> BackendResult<Vec<Teacher>> {
        if self.lookups_fail() {
            return Err(boom());
        }
        Ok(self.teachers.clone())
    }

    async fn rooms(&self) -> BackendResult<Vec<Room>> {
        if self.lookups_fail() {
            return Err(boom());
        }
        Ok(self.rooms.clone())
    }

    async fn class_options(&self) -> BackendResult<Vec<ClassOption>> {
        if self.lookups_fail() {
            return Err(boom());
        }
        Ok(self.class_options.clone())
    }

    async fn check_conflict(&self, request: &ConflictCheckRequest) -> BackendResult<Option<ConflictDetail>> {
        self.record(Call::CheckConflict(request.clone()));
        if self.fail_conflict_checks.load(Ordering::SeqCst) {
            return Err(boom());
        }
        let wanted = match (parse_clock(&request.start_time), parse_clock(&request.end_time)) {
            (Some(start), Some(end)) => TimeRange::new(start, end),
            _ => return Ok(None),
        };
        Ok(self
            .conflicts
            .iter()
            .find(|c| {
                let range = TimeRange::parse(&format!("{}-{}", c.start_time, c.end_time));
                c.date == request.date && range.is_some_and(|r| r.overlaps(&wanted))
            })
            .cloned())
    }

    async fn check_conflicts(&self, request: &ConflictBatchRequest) -> BackendResult<Vec<ConflictDetail>> {
        self.record(Call::CheckConflicts(request.clone()));
        if self.fail_conflict_checks.load(Ordering::SeqCst) {
            return Err(boom());
        }
        Ok(self.conflicts.clone())
    }

    async fn create_session(&self, session: &NewSession) -> BackendResult<CreatedSession> {
        self.record(Call::CreateSession(session.clone()));
        if self.fail_session_for.lock().unwrap().as_deref() == Some(session.student_id.as_str()) {
            return Err(boom());
        }
        let created = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateSession(_)))
            .count() as i64;
        Ok(CreatedSession { id: 100 + created })
    }

    async fn update_session(&self, session_id: i64, update: &SessionUpdate) -> BackendResult<()> {
        self.record(Call::UpdateSession(session_id, update.clone()));
        Ok(())
    }

    async fn create_schedules(&self, schedules: &[NewSchedule]) -> BackendResult<BulkCreated> {
        self.record(Call::CreateSchedules(schedules.to_vec()));
        if self.fail_bulk.load(Ordering::SeqCst) {
            return Err(boom());
        }
        Ok(BulkCreated { created: schedules.len() })
    }

    async fn apply_package(&self, package_id: i64, course_id: i64) -> BackendResult<()> {
        self.record(Call::ApplyPackage(package_id, course_id));
        Ok(())
    }
}
