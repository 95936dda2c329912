// src/services/wizard_service.rs
//! Máquina de estados do assistente de matrícula.
//!
//! `course -> schedule -> teacher -> confirm`, mais `closed`. As quatro variantes
//! partilham a mesma forma; só mudam o passo inicial e as regras de salto:
//!
//! - resgate de pacote "check": `course -> confirm` (horário aberto, professor TBD)
//! - troca de horário "check": `schedule -> confirm` (professor TBD)
//!
//! Recuar nunca apaga o que já foi escolhido; cancelar apaga tudo.

use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::{resolve_student, ClassKind, Course, Student, NO_SELECTION},
        notice::Notice,
        schedule::{ClassSchedule, DaySelection, TeacherData, TBD},
        wizard::{WizardState, WizardStep, WizardVariant},
    },
    services::{backend::Backend, conflict_service, expansion_service},
};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;
use uuid::Uuid;

/// Abre uma nova execução. O curso pode vir pré-selecionado (cartão de curso).
pub fn open(
    variant: WizardVariant,
    students: Vec<Student>,
    course: Option<Course>,
    return_to: impl Into<String>,
) -> AppResult<WizardState> {
    if students.is_empty() {
        return Err(AppError::Validation("Select at least one student.".into()));
    }
    // as linhas guardam só o nome mostrado; tem de voltar ao mesmo aluno
    if let Some(ambiguous) = students
        .iter()
        .find(|s| resolve_student(&students, s.display_name()).map(|r| &r.id) != Some(&s.id))
    {
        return Err(AppError::Validation(format!(
            "'{}' matches more than one selected student. Enroll them separately.",
            ambiguous.display_name()
        )));
    }

    let course = match &variant {
        WizardVariant::ScheduleSwap { session } => Some(Course {
            id: session.course_id,
            title: session.course_title.clone(),
        }),
        _ => course,
    };

    let state = WizardState {
        run_id: Uuid::new_v4(),
        step: variant.first_step(),
        variant,
        course,
        students,
        return_to: return_to.into(),
        ..Default::default()
    };
    tracing::info!(
        "Assistente aberto: {} ({}), {} aluno(s), passo {}",
        state.variant.label(),
        state.run_id,
        state.students.len(),
        state.step.as_str()
    );
    Ok(state)
}

fn expect_step(state: &WizardState, expected: WizardStep) -> AppResult<()> {
    if !state.is_open() {
        return Err(AppError::WizardClosed);
    }
    if state.step != expected {
        return Err(AppError::WrongStep { expected, actual: state.step });
    }
    Ok(())
}

/// Guarda o curso escolhido. Trocar de curso invalida horário e professor
/// (os professores dependem do curso); voltar a escolher o mesmo não apaga nada.
pub fn select_course(state: &mut WizardState, course: Course) -> AppResult<()> {
    expect_step(state, WizardStep::Course)?;
    if !course.is_selected() {
        return Err(AppError::Validation("Please select a course.".into()));
    }
    let changed = state.course.as_ref().map(|c| c.id) != Some(course.id);
    if changed {
        state.class_schedule = None;
        state.teacher_data = None;
        state.rows.clear();
    }
    state.course = Some(course);
    Ok(())
}

pub fn select_schedule(state: &mut WizardState, schedule: ClassSchedule) -> AppResult<()> {
    expect_step(state, WizardStep::Schedule)?;
    validate_schedule(state, &schedule)?;
    if state.class_schedule.as_ref().map(|s| s.kind) != Some(schedule.kind) {
        state.teacher_data = None;
    }
    state.class_schedule = Some(schedule);
    Ok(())
}

pub fn select_teacher(state: &mut WizardState, teacher: TeacherData) -> AppResult<()> {
    expect_step(state, WizardStep::Teacher)?;
    let teacher = validate_teacher(state, teacher)?;
    state.teacher_data = Some(teacher);
    Ok(())
}

fn schedule_kind(state: &WizardState) -> Option<ClassKind> {
    state.class_schedule.as_ref().map(|s| s.kind)
}

fn package_is_check(state: &WizardState) -> bool {
    matches!(&state.variant, WizardVariant::PackageRedemption { package }
        if package.class_option().kind() == ClassKind::Check)
}

/// Passo em que a execução salta diretamente para `confirm`, se saltar.
fn skips_to_confirm_from(state: &WizardState) -> Option<WizardStep> {
    match &state.variant {
        WizardVariant::PackageRedemption { .. } if package_is_check(state) => Some(WizardStep::Course),
        WizardVariant::ScheduleSwap { .. } if schedule_kind(state) == Some(ClassKind::Check) => {
            Some(WizardStep::Schedule)
        }
        _ => None,
    }
}

fn check_times(start: NaiveTime, end: NaiveTime) -> AppResult<()> {
    if start >= end {
        return Err(AppError::Validation("Start time must be before end time.".into()));
    }
    Ok(())
}

fn validate_schedule(state: &WizardState, schedule: &ClassSchedule) -> AppResult<()> {
    if schedule.class_option.id == NO_SELECTION {
        return Err(AppError::Validation("Please select a class type.".into()));
    }
    if let WizardVariant::PackageRedemption { package } = &state.variant {
        if package.class_option_id != schedule.class_option.id {
            return Err(AppError::Validation(
                "The class type must match the package being redeemed.".into(),
            ));
        }
    }

    match (&schedule.kind, &schedule.selection) {
        (ClassKind::Fixed, DaySelection::Fixed { days, start_time, end_time }) => {
            if days.is_empty() {
                return Err(AppError::Validation("Select at least one weekday.".into()));
            }
            check_times(*start_time, *end_time)
        }
        (ClassKind::Camp, DaySelection::Camp { dates, start_time, end_time }) => {
            let distinct: HashSet<&NaiveDate> = dates.iter().collect();
            if dates.is_empty() || distinct.len() != dates.len() {
                return Err(AppError::Validation("Select the camp dates (each date once).".into()));
            }
            if let Some(required) = schedule.class_option.session_count() {
                if dates.len() != required {
                    return Err(AppError::Validation(format!(
                        "Select exactly {} camp dates ({} selected).",
                        required,
                        dates.len()
                    )));
                }
            }
            check_times(*start_time, *end_time)
        }
        (ClassKind::Check | ClassKind::Flexible, DaySelection::Open) => Ok(()),
        (kind, _) => Err(AppError::Validation(format!(
            "The selected days do not fit a {} class.",
            kind.as_str()
        ))),
    }
}

fn validate_teacher(state: &WizardState, mut teacher: TeacherData) -> AppResult<TeacherData> {
    let optional = schedule_kind(state).is_some_and(|k| k.teacher_optional());
    if teacher.is_unassigned() {
        if !optional {
            return Err(AppError::Validation("Please select a teacher.".into()));
        }
        teacher.teacher = TBD.to_string();
    }
    if teacher.room.trim().is_empty() {
        if !optional {
            return Err(AppError::Validation("Please select a room.".into()));
        }
        teacher.room = TBD.to_string();
    }
    teacher.room = teacher.room.trim().to_string();
    Ok(teacher)
}

/// Avança um passo se os dados mínimos do passo atual existirem.
pub fn advance(state: &mut WizardState) -> AppResult<WizardStep> {
    let next = match state.step {
        WizardStep::Course => {
            if !state.course.as_ref().is_some_and(Course::is_selected) {
                return Err(AppError::Validation("Please select a course.".into()));
            }
            match &state.variant {
                WizardVariant::PackageRedemption { package } if package_is_check(state) => {
                    state.class_schedule = Some(ClassSchedule::open(package.class_option()));
                    state.teacher_data = Some(TeacherData::tbd());
                    WizardStep::Confirm
                }
                _ => WizardStep::Schedule,
            }
        }
        WizardStep::Schedule => {
            let schedule = state
                .class_schedule
                .as_ref()
                .ok_or_else(|| AppError::Validation("Please select a class type.".into()))?;
            validate_schedule(state, schedule)?;
            if matches!(state.variant, WizardVariant::ScheduleSwap { .. }) && schedule.kind == ClassKind::Check {
                state.teacher_data = Some(TeacherData::tbd());
                WizardStep::Confirm
            } else {
                WizardStep::Teacher
            }
        }
        WizardStep::Teacher => {
            let teacher = state
                .teacher_data
                .clone()
                .ok_or_else(|| AppError::Validation("Please select a teacher.".into()))?;
            state.teacher_data = Some(validate_teacher(state, teacher)?);
            WizardStep::Confirm
        }
        WizardStep::Confirm => {
            return Err(AppError::Validation("Use confirm to submit the enrollment.".into()));
        }
        WizardStep::Closed => return Err(AppError::WizardClosed),
    };

    tracing::debug!("Assistente {}: {} -> {}", state.run_id, state.step.as_str(), next.as_str());
    state.step = next;
    Ok(next)
}

/// Recua um passo; o primeiro passo de cada variante fica onde está.
pub fn back(state: &mut WizardState) -> WizardStep {
    let previous = match state.step {
        WizardStep::Closed => WizardStep::Closed,
        WizardStep::Course => WizardStep::Course,
        WizardStep::Schedule => match state.variant {
            WizardVariant::ScheduleSwap { .. } => WizardStep::Schedule,
            _ => WizardStep::Course,
        },
        WizardStep::Teacher => WizardStep::Schedule,
        WizardStep::Confirm => {
            // linhas são derivadas; voltam a ser geradas ao regressar ao confirm
            state.rows.clear();
            state.rows_edited = false;
            skips_to_confirm_from(state).unwrap_or(WizardStep::Teacher)
        }
    };
    tracing::debug!("Assistente {}: {} <- {}", state.run_id, previous.as_str(), state.step.as_str());
    state.step = previous;
    previous
}

/// `back` para os handlers: avisa quando se perdem linhas editadas à mão.
pub fn step_back(state: &mut WizardState) -> Option<Notice> {
    let discards_edits = state.step == WizardStep::Confirm && state.rows_edited;
    back(state);
    discards_edits.then(|| Notice::info("Your edits to individual classes were discarded."))
}

/// Cancelar em qualquer passo: tudo volta ao vazio e o assistente fecha.
pub fn cancel(state: &mut WizardState) {
    if state.is_open() {
        tracing::info!("Assistente {} cancelado no passo {}", state.run_id, state.step.as_str());
    }
    *state = WizardState::default();
}

/// Gera as linhas da confirmação e anota os conflitos (um único pedido em lote).
pub async fn prepare_confirmation<B: Backend>(
    backend: &B,
    state: &mut WizardState,
    today: NaiveDate,
) -> AppResult<Option<Notice>> {
    expect_step(state, WizardStep::Confirm)?;
    let (Some(schedule), Some(teacher)) = (&state.class_schedule, &state.teacher_data) else {
        return Err(AppError::Validation("Class type and teacher are required.".into()));
    };

    let mut rows = expansion_service::expand_rows(schedule, &state.students, teacher, today);
    let notice = conflict_service::annotate_rows(backend, &mut rows, &state.students).await;
    state.rows = rows;
    state.rows_edited = false;
    Ok(notice)
}

/// `advance` seguido da geração de linhas quando se chega ao confirm.
pub async fn advance_and_prepare<B: Backend>(
    backend: &B,
    state: &mut WizardState,
    today: NaiveDate,
) -> AppResult<Option<Notice>> {
    match advance(state)? {
        WizardStep::Confirm => prepare_confirmation(backend, state, today).await,
        _ => Ok(None),
    }
}
