// src/web/wizard_handlers.rs
use crate::{
    error::{AppError, AppResult, BackendResult},
    models::{
        catalog::{ClassKind, ClassOption, Course, ExistingSession, Student, NO_SELECTION},
        notice::Notice,
        schedule::{parse_clock, Attendance, ClassSchedule, DaySelection, TeacherData, TBD},
        wizard::{WizardState, WizardStep, WizardVariant},
    },
    services::{
        backend::Backend,
        editor_service::{self, EditContext, EditOutcome, RowEditForm},
        submission_service, wizard_service,
    },
    state::{AppState, InFlightRegistry},
    templates::{RowEditorPage, StepLookups, WizardPage},
    web::wizard_session::{load_wizard, persist, push_notice, save_wizard, take_notices},
};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;
use tower_sessions::Session;

const WIZARD_PATH: &str = "/wizard";

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Só caminhos locais; qualquer outra coisa volta ao assistente.
fn safe_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => WIZARD_PATH.to_string(),
    }
}

/// Busca opcional: em caso de falha devolve a lista vazia e um toast de erro.
fn or_notice<T: Default>(result: BackendResult<T>, what: &str, notices: &mut Vec<Notice>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Falha ao carregar {}: {}", what, e);
            notices.push(Notice::error(format!("Could not load {}.", what)));
            T::default()
        }
    }
}

/// Professores do curso e salas, para o passo de professor e para o editor.
async fn teacher_lookups<B: Backend>(backend: &B, wizard: &WizardState, notices: &mut Vec<Notice>) -> StepLookups {
    let mut lookups = StepLookups::default();
    if let Some(course) = &wizard.course {
        lookups.teachers = or_notice(backend.teachers_by_course(course.id).await, "teachers", notices);
    }
    lookups.rooms = or_notice(backend.rooms().await, "rooms", notices);
    lookups
}

async fn step_lookups<B: Backend>(backend: &B, wizard: &WizardState, notices: &mut Vec<Notice>) -> StepLookups {
    match wizard.step {
        WizardStep::Schedule => {
            let mut options = or_notice(backend.class_options().await, "class types", notices);
            // num resgate só o tipo de aula do pacote é válido
            if let WizardVariant::PackageRedemption { package } = &wizard.variant {
                options.retain(|o| o.id == package.class_option_id);
                if options.is_empty() {
                    options.push(package.class_option());
                }
            }
            StepLookups { class_options: options, ..Default::default() }
        }
        WizardStep::Teacher => teacher_lookups(backend, wizard, notices).await,
        _ => StepLookups::default(),
    }
}

/// Fecha um passo: erros de validação e do backend viram toasts e o
/// utilizador volta ao assistente; os restantes erros sobem.
async fn finish_step(session: &Session, wizard: &WizardState, result: AppResult<Option<Notice>>) -> AppResult<Redirect> {
    let notice = match result {
        Ok(notice) => notice,
        Err(AppError::Validation(message)) => Some(Notice::error(message)),
        Err(AppError::Backend(e)) => {
            tracing::warn!("Passo {} falhou no backend: {}", wizard.step.as_str(), e);
            Some(Notice::error("The school server could not be reached. Please try again."))
        }
        Err(e) => return Err(e),
    };
    save_wizard(session, wizard).await?;
    if let Some(notice) = notice {
        push_notice(session, notice).await?;
    }
    Ok(Redirect::to(WIZARD_PATH))
}

fn parse_id(raw: &str, what: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Please select a {}.", what)))
}

// --- GET /wizard ---

pub async fn show_wizard(State(state): State<AppState>, session: Session) -> AppResult<impl IntoResponse> {
    let wizard = load_wizard(&session).await?;
    let mut notices = take_notices(&session).await?;
    let lookups = step_lookups(&*state.backend, &wizard, &mut notices).await;
    let submitting = wizard.is_open() && state.in_flight.is_in_flight(wizard.run_id);

    tracing::debug!("GET /wizard: passo {}", wizard.step.as_str());
    let page = WizardPage::from_state(&wizard, &lookups, notices, submitting);
    Ok(Html(page.render()?))
}

// --- Entradas do assistente ---

#[derive(Debug, Deserialize)]
pub struct StartForm {
    /// Ids separados por vírgula.
    pub student_ids: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// `?return_to=/students/7` nas entradas que partem de uma página existente.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnQuery {
    #[serde(default)]
    pub return_to: Option<String>,
}

fn split_ids(raw: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

async fn fetch_students<B: Backend>(backend: &B, ids: &[String]) -> AppResult<Vec<Student>> {
    let mut students = Vec::with_capacity(ids.len());
    for id in ids {
        students.push(backend.student(id).await?);
    }
    Ok(students)
}

/// Abre a execução e guarda-a, substituindo qualquer execução anterior desta sessão.
/// Se a abertura falhar, a execução anterior fica intacta.
async fn open_run(session: &Session, result: AppResult<WizardState>) -> AppResult<Redirect> {
    match result {
        Ok(wizard) => finish_step(session, &wizard, Ok(None)).await,
        Err(AppError::Validation(message)) => {
            push_notice(session, Notice::error(message)).await?;
            Ok(Redirect::to(WIZARD_PATH))
        }
        Err(AppError::Backend(e)) => {
            tracing::warn!("Não foi possível abrir o assistente: {}", e);
            push_notice(session, Notice::error("The school server could not be reached. Please try again.")).await?;
            Ok(Redirect::to(WIZARD_PATH))
        }
        Err(e) => Err(e),
    }
}

async fn open_new_enrollment<B: Backend>(backend: &B, form: &StartForm) -> AppResult<WizardState> {
    let ids = split_ids(&form.student_ids);
    let students = fetch_students(backend, &ids).await?;
    let course = match form.course_id.trim() {
        "" => None,
        raw => Some(backend.course(parse_id(raw, "course")?).await?),
    };
    wizard_service::open(
        WizardVariant::NewEnrollment,
        students,
        course,
        safe_return_to(form.return_to.as_deref()),
    )
}

async fn open_package<B: Backend>(backend: &B, package_id: i64, return_to: Option<&str>) -> AppResult<WizardState> {
    let package = backend.package(package_id).await?;
    let student = backend.student(&package.student_id).await?;
    wizard_service::open(
        WizardVariant::PackageRedemption { package },
        vec![student],
        None,
        safe_return_to(return_to),
    )
}

/// Atribuição de curso e troca de horário partem de uma sessão existente.
async fn open_existing<B: Backend>(
    backend: &B,
    session_id: i64,
    variant: fn(ExistingSession) -> WizardVariant,
    return_to: Option<&str>,
) -> AppResult<WizardState> {
    let existing = backend.session(session_id).await?;
    let student = backend.student(&existing.student_id).await?;
    wizard_service::open(variant(existing), vec![student], None, safe_return_to(return_to))
}

pub async fn start(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<StartForm>,
) -> AppResult<Redirect> {
    let result = open_new_enrollment(&*state.backend, &form).await;
    open_run(&session, result).await
}

pub async fn start_package(
    State(state): State<AppState>,
    session: Session,
    Path(package_id): Path<i64>,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Redirect> {
    let result = open_package(&*state.backend, package_id, query.return_to.as_deref()).await;
    open_run(&session, result).await
}

pub async fn start_assign(
    State(state): State<AppState>,
    session: Session,
    Path(session_id): Path<i64>,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Redirect> {
    let variant = |existing| WizardVariant::CourseAssignment { session: existing };
    let result = open_existing(&*state.backend, session_id, variant, query.return_to.as_deref()).await;
    open_run(&session, result).await
}

pub async fn start_swap(
    State(state): State<AppState>,
    session: Session,
    Path(session_id): Path<i64>,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Redirect> {
    let variant = |existing| WizardVariant::ScheduleSwap { session: existing };
    let result = open_existing(&*state.backend, session_id, variant, query.return_to.as_deref()).await;
    open_run(&session, result).await
}

// --- Passos ---

#[derive(Debug, Deserialize)]
pub struct CourseForm {
    pub course_id: String,
}

pub async fn submit_course(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CourseForm>,
) -> AppResult<Redirect> {
    let backend = &*state.backend;
    let mut wizard = load_wizard(&session).await?;
    let result = async {
        let course_id = parse_id(&form.course_id, "course")?;
        let course: Course = backend.course(course_id).await?;
        wizard_service::select_course(&mut wizard, course)?;
        wizard_service::advance_and_prepare(backend, &mut wizard, today()).await
    }
    .await;
    finish_step(&session, &wizard, result).await
}

#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    #[serde(default = "no_selection")]
    pub class_option_id: i64,
    /// Dias da semana separados por vírgula ("mon,wed").
    #[serde(default)]
    pub days: String,
    /// Datas do camp separadas por vírgula.
    #[serde(default)]
    pub dates: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

fn no_selection() -> i64 {
    NO_SELECTION
}

fn form_times(form: &ScheduleForm) -> AppResult<(NaiveTime, NaiveTime)> {
    let start = parse_clock(&form.start_time)
        .ok_or_else(|| AppError::Validation("Start time is required.".into()))?;
    let end = parse_clock(&form.end_time)
        .ok_or_else(|| AppError::Validation("End time is required.".into()))?;
    Ok((start, end))
}

/// Converte o formulário no horário do tipo de aula escolhido.
fn schedule_from_form(option: ClassOption, form: &ScheduleForm) -> AppResult<ClassSchedule> {
    let selection = match option.kind() {
        ClassKind::Fixed => {
            let mut days = Vec::new();
            for raw in form.days.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let day = raw
                    .parse::<Weekday>()
                    .map_err(|_| AppError::Validation(format!("Unknown weekday '{}'.", raw)))?;
                days.push(day);
            }
            let (start_time, end_time) = form_times(form)?;
            DaySelection::Fixed { days, start_time, end_time }
        }
        ClassKind::Camp => {
            let mut dates = Vec::new();
            for raw in form.dates.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let date = editor_service::parse_row_date(raw)
                    .ok_or_else(|| AppError::Validation(format!("Invalid date '{}'.", raw)))?;
                dates.push(date);
            }
            let (start_time, end_time) = form_times(form)?;
            DaySelection::Camp { dates, start_time, end_time }
        }
        ClassKind::Check | ClassKind::Flexible => DaySelection::Open,
    };
    Ok(ClassSchedule::new(option, selection))
}

async fn resolve_class_option<B: Backend>(backend: &B, wizard: &WizardState, option_id: i64) -> AppResult<ClassOption> {
    if option_id == NO_SELECTION {
        return Err(AppError::Validation("Please select a class type.".into()));
    }
    if let WizardVariant::PackageRedemption { package } = &wizard.variant {
        if package.class_option_id == option_id {
            return Ok(package.class_option());
        }
    }
    backend
        .class_options()
        .await?
        .into_iter()
        .find(|o| o.id == option_id)
        .ok_or_else(|| AppError::Validation("Please select a class type.".into()))
}

pub async fn submit_schedule(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ScheduleForm>,
) -> AppResult<Redirect> {
    let backend = &*state.backend;
    let mut wizard = load_wizard(&session).await?;
    let result = async {
        let option = resolve_class_option(backend, &wizard, form.class_option_id).await?;
        let schedule = schedule_from_form(option, &form)?;
        wizard_service::select_schedule(&mut wizard, schedule)?;
        wizard_service::advance_and_prepare(backend, &mut wizard, today()).await
    }
    .await;
    finish_step(&session, &wizard, result).await
}

#[derive(Debug, Deserialize)]
pub struct TeacherForm {
    #[serde(default = "no_selection")]
    pub teacher_id: i64,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub remark: String,
}

pub async fn submit_teacher(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<TeacherForm>,
) -> AppResult<Redirect> {
    let backend = &*state.backend;
    let mut wizard = load_wizard(&session).await?;
    let result = async {
        let teacher = if form.teacher_id == NO_SELECTION {
            TBD.to_string()
        } else {
            let course_id = wizard
                .course
                .as_ref()
                .map(|c| c.id)
                .ok_or_else(|| AppError::Validation("Please select a course.".into()))?;
            backend
                .teachers_by_course(course_id)
                .await?
                .into_iter()
                .find(|t| t.id == form.teacher_id)
                .map(|t| t.name)
                .ok_or_else(|| AppError::Validation("Please select a teacher.".into()))?
        };
        let data = TeacherData {
            teacher,
            teacher_id: form.teacher_id,
            room: form.room.clone(),
            remark: form.remark.trim().to_string(),
        };
        wizard_service::select_teacher(&mut wizard, data)?;
        wizard_service::advance_and_prepare(backend, &mut wizard, today()).await
    }
    .await;
    finish_step(&session, &wizard, result).await
}

pub async fn back(session: Session) -> AppResult<Redirect> {
    let mut wizard = load_wizard(&session).await?;
    if !wizard.is_open() {
        return Err(AppError::WizardClosed);
    }
    let notice = wizard_service::step_back(&mut wizard);
    finish_step(&session, &wizard, Ok(notice)).await
}

pub async fn cancel(session: Session) -> AppResult<Redirect> {
    let mut wizard = load_wizard(&session).await?;
    let return_to = safe_return_to(Some(&wizard.return_to));
    wizard_service::cancel(&mut wizard);
    save_wizard(&session, &wizard).await?;
    Ok(Redirect::to(&return_to))
}

// --- Editor de linha ---

fn confirm_rows(wizard: &WizardState) -> AppResult<()> {
    if !wizard.is_open() {
        return Err(AppError::WizardClosed);
    }
    if wizard.step != WizardStep::Confirm {
        return Err(AppError::WrongStep { expected: WizardStep::Confirm, actual: wizard.step });
    }
    Ok(())
}

fn teacher_optional(wizard: &WizardState) -> bool {
    wizard
        .class_schedule
        .as_ref()
        .is_some_and(|s| s.kind.teacher_optional())
}

pub async fn edit_row_form(
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
) -> AppResult<Response> {
    let wizard = load_wizard(&session).await?;
    confirm_rows(&wizard)?;
    let row = wizard.rows.get(index).ok_or(AppError::RowNotFound(index))?;

    if row.attendance == Attendance::Cancelled {
        push_notice(&session, Notice::info("Cancelled classes cannot be edited.")).await?;
        return Ok(Redirect::to(WIZARD_PATH).into_response());
    }

    let mut notices = take_notices(&session).await?;
    let lookups = teacher_lookups(&*state.backend, &wizard, &mut notices).await;
    let page = RowEditorPage::new(index, RowEditForm::from_row(row), &lookups, teacher_optional(&wizard), notices);
    Ok(Html(page.render()?).into_response())
}

pub async fn edit_row_save(
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
    Form(form): Form<RowEditForm>,
) -> AppResult<Response> {
    let backend = &*state.backend;
    let mut wizard = load_wizard(&session).await?;
    confirm_rows(&wizard)?;

    let mut notices = Vec::new();
    let lookups = teacher_lookups(backend, &wizard, &mut notices).await;
    let allow_tbd = teacher_optional(&wizard);
    let ctx = EditContext { students: &wizard.students, teachers: &lookups.teachers, teacher_optional: allow_tbd };

    let outcome = editor_service::save_row_edit(backend, &mut wizard.rows, index, &form, &ctx).await;
    match outcome {
        Ok(EditOutcome::Saved { index, notice }) => {
            tracing::debug!("Linha {} gravada na execução {}", index, wizard.run_id);
            wizard.rows_edited = true;
            save_wizard(&session, &wizard).await?;
            for n in notices.into_iter().chain(notice) {
                push_notice(&session, n).await?;
            }
            Ok(Redirect::to(WIZARD_PATH).into_response())
        }
        Ok(EditOutcome::Locked(notice)) => {
            push_notice(&session, notice).await?;
            Ok(Redirect::to(WIZARD_PATH).into_response())
        }
        Err(AppError::Validation(message)) => {
            // volta a mostrar o editor com o que foi escrito
            notices.push(Notice::error(message));
            let page = RowEditorPage::new(index, form, &lookups, allow_tbd, notices);
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}

// --- POST /wizard/confirm ---

pub async fn confirm(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    confirm_run(&*state.backend, &state.in_flight, &session).await
}

/// A sessão é gravada no store antes de o guard ser libertado: um segundo
/// pedido que chegue logo a seguir já lê o assistente fechado (ou as sessões
/// criadas) em vez do estado anterior à confirmação.
async fn confirm_run<B: Backend>(backend: &B, in_flight: &InFlightRegistry, session: &Session) -> AppResult<Redirect> {
    let mut wizard = load_wizard(session).await?;
    if !wizard.is_open() {
        return Err(AppError::WizardClosed);
    }
    let _guard = in_flight
        .try_begin(wizard.run_id)
        .ok_or(AppError::DuplicateSubmission)?;

    match submission_service::submit(backend, &mut wizard).await {
        Ok(report) => {
            let return_to = safe_return_to(Some(&wizard.return_to));
            let message = match report.schedules_created {
                0 => "Enrollment saved.".to_string(),
                n => format!("Enrollment saved with {} class(es).", n),
            };
            wizard_service::cancel(&mut wizard);
            save_wizard(session, &wizard).await?;
            push_notice(session, Notice::success(message)).await?;
            persist(session).await?;
            Ok(Redirect::to(&return_to))
        }
        Err(e @ (AppError::Validation(_) | AppError::Backend(_))) => {
            tracing::warn!("Confirmação da execução {} falhou: {}", wizard.run_id, e);
            // o estado guarda as sessões já criadas para a próxima tentativa
            save_wizard(session, &wizard).await?;
            let message = match e {
                AppError::Validation(message) => message,
                _ => "Saving the enrollment failed. Please try again.".to_string(),
            };
            push_notice(session, Notice::error(message)).await?;
            persist(session).await?;
            Ok(Redirect::to(WIZARD_PATH))
        }
        Err(e) => {
            save_wizard(session, &wizard).await?;
            persist(session).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        catalog::{Package, Room, Teacher},
        notice::NoticeLevel,
        schedule::{ScheduleRow, TimeRange},
    };
    use crate::services::testing::{Call, MockBackend};
    use axum::http::header::LOCATION;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn alice() -> Student {
        Student { id: "s1".into(), name: "Alice".into(), nickname: None }
    }

    fn math() -> Course {
        Course { id: 3, title: "Math".into() }
    }

    fn teacher_data() -> TeacherData {
        TeacherData { teacher: "Ms Lee".into(), teacher_id: 7, room: "R1".into(), remark: String::new() }
    }

    /// Execução de um aluno parada no ecrã de confirmação, com uma aula.
    fn ready_to_confirm() -> WizardState {
        let mut wizard = wizard_service::open(WizardVariant::NewEnrollment, vec![alice()], Some(math()), "/students/s1")
            .unwrap();
        let clock = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        wizard.step = WizardStep::Confirm;
        wizard.class_schedule = Some(ClassSchedule::new(
            option("12 times fixed"),
            DaySelection::Fixed { days: vec![Weekday::Mon], start_time: clock(10), end_time: clock(11) },
        ));
        wizard.teacher_data = Some(teacher_data());
        wizard.rows = vec![ScheduleRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            time: TimeRange::new(clock(10), clock(11)),
            student: "Alice".into(),
            teacher: "Ms Lee".into(),
            teacher_id: 7,
            room: "R1".into(),
            remark: String::new(),
            warning: String::new(),
            attendance: Attendance::Pending,
            class_number: 1,
        }];
        wizard
    }

    /// Guarda o assistente no store e devolve o id do cookie.
    async fn stored_session(store: &Arc<MemoryStore>, wizard: &WizardState) -> Option<tower_sessions::session::Id> {
        let session = Session::new(None, store.clone(), None);
        save_wizard(&session, wizard).await.unwrap();
        persist(&session).await.unwrap();
        session.id()
    }

    fn created_sessions(backend: &MockBackend) -> usize {
        backend.calls().iter().filter(|c| matches!(c, Call::CreateSession(_))).count()
    }

    #[tokio::test]
    async fn confirm_writes_the_closed_wizard_before_releasing_the_run() {
        let store = Arc::new(MemoryStore::default());
        let backend = MockBackend::default();
        let in_flight = InFlightRegistry::default();
        let id = stored_session(&store, &ready_to_confirm()).await;

        // o pedido termina sem o middleware gravar a sessão
        let first = Session::new(id, store.clone(), None);
        let redirect = confirm_run(&backend, &in_flight, &first).await.unwrap();
        assert_eq!(redirect.into_response().headers()[LOCATION], "/students/s1");

        let second = Session::new(id, store.clone(), None);
        assert!(matches!(
            confirm_run(&backend, &in_flight, &second).await,
            Err(AppError::WizardClosed)
        ));
        assert_eq!(created_sessions(&backend), 1);
        let notices = take_notices(&second).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn confirm_while_the_same_run_is_submitting_is_refused() {
        let store = Arc::new(MemoryStore::default());
        let backend = MockBackend::default();
        let in_flight = InFlightRegistry::default();
        let wizard = ready_to_confirm();
        let id = stored_session(&store, &wizard).await;

        let _pending = in_flight.try_begin(wizard.run_id).unwrap();
        let session = Session::new(id, store.clone(), None);
        let result = confirm_run(&backend, &in_flight, &session).await;

        assert!(matches!(result, Err(AppError::DuplicateSubmission)));
        assert_eq!(result.unwrap_err().into_response().status(), axum::http::StatusCode::CONFLICT);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_confirm_keeps_created_sessions_for_the_retry() {
        let store = Arc::new(MemoryStore::default());
        let backend = MockBackend::default();
        backend.set(&backend.fail_bulk, true);
        let in_flight = InFlightRegistry::default();
        let id = stored_session(&store, &ready_to_confirm()).await;

        let first = Session::new(id, store.clone(), None);
        let redirect = confirm_run(&backend, &in_flight, &first).await.unwrap();
        assert_eq!(redirect.into_response().headers()[LOCATION], WIZARD_PATH);

        let retry = Session::new(id, store.clone(), None);
        let stored = load_wizard(&retry).await.unwrap();
        assert_eq!(stored.step, WizardStep::Confirm);
        assert_eq!(stored.created_sessions.get("s1"), Some(&101));

        backend.set(&backend.fail_bulk, false);
        confirm_run(&backend, &in_flight, &retry).await.unwrap();
        assert_eq!(created_sessions(&backend), 1);
        assert!(!load_wizard(&retry).await.unwrap().is_open());
    }

    #[tokio::test]
    async fn failed_lookups_degrade_to_empty_lists_and_error_toasts() {
        let backend = MockBackend {
            class_options: vec![option("12 times fixed")],
            teachers: vec![Teacher { id: 7, name: "Ms Lee".into() }],
            rooms: vec![Room { id: 1, name: "R1".into() }],
            ..Default::default()
        };
        backend.set(&backend.fail_lookups, true);
        let mut wizard = ready_to_confirm();

        wizard.step = WizardStep::Schedule;
        let mut notices = Vec::new();
        let lookups = step_lookups(&backend, &wizard, &mut notices).await;
        assert!(lookups.class_options.is_empty());
        assert_eq!(notices, vec![Notice::error("Could not load class types.")]);

        wizard.step = WizardStep::Teacher;
        let mut notices = Vec::new();
        let lookups = step_lookups(&backend, &wizard, &mut notices).await;
        assert!(lookups.teachers.is_empty() && lookups.rooms.is_empty());
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));

        backend.set(&backend.fail_lookups, false);
        let mut notices = Vec::new();
        let lookups = teacher_lookups(&backend, &wizard, &mut notices).await;
        assert_eq!(lookups.teachers.len(), 1);
        assert_eq!(lookups.rooms.len(), 1);
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn package_redemption_only_offers_the_package_class_type() {
        let package = Package {
            id: 55,
            student_id: "s1".into(),
            class_option_id: 9,
            class_mode: "5 days camp".into(),
            class_limit: 1,
            tuition_fee: 0.0,
        };
        let mut wizard =
            wizard_service::open(WizardVariant::PackageRedemption { package }, vec![alice()], None, "/").unwrap();
        wizard.step = WizardStep::Schedule;

        let mut camp = option("5 days camp");
        camp.id = 9;
        let backend = MockBackend { class_options: vec![option("12 times fixed"), camp], ..Default::default() };
        let mut notices = Vec::new();
        let lookups = step_lookups(&backend, &wizard, &mut notices).await;
        assert_eq!(lookups.class_options.iter().map(|o| o.id).collect::<Vec<_>>(), vec![9]);

        // se a lista não o trouxer, o tipo do pacote continua disponível
        let backend = MockBackend { class_options: vec![option("12 times fixed")], ..Default::default() };
        let lookups = step_lookups(&backend, &wizard, &mut notices).await;
        assert_eq!(lookups.class_options.len(), 1);
        assert_eq!(lookups.class_options[0].id, 9);
        assert_eq!(lookups.class_options[0].class_mode, "5 days camp");
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn entry_points_load_what_they_start_from() {
        let existing = ExistingSession {
            id: 900,
            student_id: "s1".into(),
            course_id: 3,
            course_title: "Math".into(),
            teacher_id: Some(7),
            class_option_id: 4,
        };
        let backend = MockBackend {
            courses: vec![math()],
            students: vec![alice(), Student { id: "s2".into(), name: "Bruno".into(), nickname: None }],
            packages: vec![Package {
                id: 55,
                student_id: "s2".into(),
                class_option_id: 9,
                class_mode: "12 times check".into(),
                class_limit: 1,
                tuition_fee: 0.0,
            }],
            sessions: vec![existing.clone()],
            ..Default::default()
        };

        let form = StartForm { student_ids: "s1, s2".into(), course_id: "3".into(), return_to: Some("/courses".into()) };
        let wizard = open_new_enrollment(&backend, &form).await.unwrap();
        assert_eq!(wizard.students.len(), 2);
        assert_eq!(wizard.course, Some(math()));
        assert_eq!(wizard.return_to, "/courses");

        let wizard = open_package(&backend, 55, None).await.unwrap();
        assert_eq!(wizard.students[0].id, "s2");
        assert_eq!(wizard.step, WizardStep::Course);

        let swap = |existing| WizardVariant::ScheduleSwap { session: existing };
        let wizard = open_existing(&backend, 900, swap, Some("/students/s1")).await.unwrap();
        assert_eq!(wizard.variant, WizardVariant::ScheduleSwap { session: existing });
        assert_eq!(wizard.step, WizardStep::Schedule);
        assert_eq!(wizard.course, Some(math()));

        assert!(matches!(open_package(&backend, 1, None).await, Err(AppError::Backend(_))));
        let unknown = StartForm { student_ids: "s9".into(), course_id: String::new(), return_to: None };
        assert!(matches!(open_new_enrollment(&backend, &unknown).await, Err(AppError::Backend(_))));
    }

    fn option(mode: &str) -> ClassOption {
        ClassOption { id: 4, class_mode: mode.into(), class_limit: 6, tuition_fee: 0.0 }
    }

    fn form(days: &str, dates: &str) -> ScheduleForm {
        ScheduleForm {
            class_option_id: 4,
            days: days.into(),
            dates: dates.into(),
            start_time: "09:00".into(),
            end_time: "10:30".into(),
        }
    }

    #[test]
    fn fixed_form_becomes_weekday_selection() {
        let schedule = schedule_from_form(option("12 times fixed"), &form("mon, wed", "")).unwrap();
        assert_eq!(schedule.kind, ClassKind::Fixed);
        assert_eq!(
            schedule.selection,
            DaySelection::Fixed {
                days: vec![Weekday::Mon, Weekday::Wed],
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            }
        );
    }

    #[test]
    fn camp_form_keeps_date_order() {
        let schedule = schedule_from_form(option("2 days camp"), &form("", "2024-07-02,2024-07-01")).unwrap();
        match schedule.selection {
            DaySelection::Camp { dates, .. } => assert_eq!(
                dates,
                vec![
                    NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                ]
            ),
            other => panic!("unexpected selection {:?}", other),
        }
    }

    #[test]
    fn open_kinds_ignore_days_and_times() {
        let mut empty = form("", "");
        empty.start_time.clear();
        let schedule = schedule_from_form(option("check"), &empty).unwrap();
        assert_eq!(schedule.selection, DaySelection::Open);
        let schedule = schedule_from_form(option("flexible"), &empty).unwrap();
        assert_eq!(schedule.selection, DaySelection::Open);
    }

    #[test]
    fn bad_form_values_are_validation_errors() {
        assert!(matches!(
            schedule_from_form(option("12 times fixed"), &form("funday", "")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            schedule_from_form(option("2 days camp"), &form("", "not a date")),
            Err(AppError::Validation(_))
        ));
        let mut no_time = form("mon", "");
        no_time.end_time.clear();
        assert!(matches!(
            schedule_from_form(option("12 times fixed"), &no_time),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn return_to_only_accepts_local_paths() {
        assert_eq!(safe_return_to(Some("/students/7")), "/students/7");
        assert_eq!(safe_return_to(Some("https://evil.test")), WIZARD_PATH);
        assert_eq!(safe_return_to(Some("//evil.test")), WIZARD_PATH);
        assert_eq!(safe_return_to(None), WIZARD_PATH);
    }

    #[test]
    fn student_ids_are_trimmed_and_deduplicated() {
        assert_eq!(split_ids(" s1, s2,,s1 "), vec!["s1".to_string(), "s2".to_string()]);
    }
}
