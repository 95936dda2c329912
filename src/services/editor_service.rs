// src/services/editor_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::{resolve_student, Student, Teacher, NO_SELECTION},
        notice::Notice,
        schedule::{parse_clock, Attendance, ScheduleRow, TimeRange, TBD},
    },
    services::{
        backend::Backend,
        conflict_service::{conflict_message, single_request, CHECK_UNAVAILABLE},
    },
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Campos do editor de linha, tal como chegam do formulário.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEditForm {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// Apelido, nome ou id do aluno.
    pub student: String,
    /// Um `<select>` vazio não envia o campo.
    #[serde(default = "unassigned_teacher")]
    pub teacher_id: i64,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub attendance: String,
}

fn unassigned_teacher() -> i64 {
    NO_SELECTION
}

impl RowEditForm {
    /// Pré-preenche o editor com os valores atuais da linha.
    pub fn from_row(row: &ScheduleRow) -> Self {
        Self {
            date: row.date.format("%Y-%m-%d").to_string(),
            start_time: row.time.start_label(),
            end_time: row.time.end_label(),
            student: row.student.clone(),
            teacher_id: row.teacher_id,
            room: row.room.clone(),
            remark: row.remark.clone(),
            attendance: row.attendance.as_str().to_string(),
        }
    }
}

/// O que o editor precisa de saber sobre a execução atual.
pub struct EditContext<'a> {
    pub students: &'a [Student],
    /// Professores do curso (carregados ao abrir o editor).
    pub teachers: &'a [Teacher],
    /// Turmas "check" aceitam professor TBD.
    pub teacher_optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Saved { index: usize, notice: Option<Notice> },
    /// Linha cancelada: nada foi alterado.
    Locked(Notice),
}

/// Datas ISO ou texto livre ("01/10/2024", "Jan 10, 2024", "Wed Jan 10 2024", RFC 3339).
pub fn parse_row_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(input) {
        return Some(stamp.date_naive());
    }
    const FORMATS: [&str; 7] = [
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d %B %Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%a %b %d %Y",
        "%d-%m-%Y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .or_else(|| {
            // "2024-01-10T08:00", "2024-01-10 00:00:00" e afins
            input
                .split_once(|c: char| c == 'T' || c == ' ')
                .and_then(|(day, _)| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        })
}

/// Validação feita só ao gravar. Devolve a linha já atualizada (sem aviso) e o id do aluno.
fn apply_form(current: &ScheduleRow, form: &RowEditForm, ctx: &EditContext<'_>) -> AppResult<(ScheduleRow, String)> {
    let date = parse_row_date(&form.date)
        .ok_or_else(|| AppError::Validation("Date is required.".into()))?;

    let start = parse_clock(&form.start_time)
        .ok_or_else(|| AppError::Validation("Start time is required.".into()))?;
    let end = parse_clock(&form.end_time)
        .ok_or_else(|| AppError::Validation("End time is required.".into()))?;
    if start >= end {
        return Err(AppError::Validation("Start time must be before end time.".into()));
    }

    let (teacher, teacher_id) = if form.teacher_id == NO_SELECTION && ctx.teacher_optional {
        (TBD.to_string(), NO_SELECTION)
    } else {
        let found = ctx
            .teachers
            .iter()
            .find(|t| t.id == form.teacher_id)
            .ok_or_else(|| AppError::Validation("Please select a teacher.".into()))?;
        (found.name.clone(), found.id)
    };

    let room = form.room.trim();
    if room.is_empty() {
        return Err(AppError::Validation("Please select a room.".into()));
    }

    let student = resolve_student(ctx.students, &form.student)
        .ok_or_else(|| AppError::Validation(format!("Unknown student '{}'.", form.student.trim())))?;

    let attendance = form
        .attendance
        .parse::<Attendance>()
        .map_err(AppError::Validation)?;

    let updated = ScheduleRow {
        date,
        time: TimeRange::new(start, end),
        student: student.display_name().to_string(),
        teacher,
        teacher_id,
        room: room.to_string(),
        remark: form.remark.trim().to_string(),
        warning: String::new(),
        attendance,
        class_number: current.class_number,
    };
    Ok((updated, student.id.clone()))
}

/// Grava uma linha editada e volta a verificar conflitos só para ela.
///
/// Uma falha na verificação nunca impede a gravação: a linha fica com o aviso
/// `CHECK_UNAVAILABLE` e devolve-se um toast de erro.
pub async fn save_row_edit<B: Backend>(
    backend: &B,
    rows: &mut [ScheduleRow],
    index: usize,
    form: &RowEditForm,
    ctx: &EditContext<'_>,
) -> AppResult<EditOutcome> {
    let current = rows.get(index).ok_or(AppError::RowNotFound(index))?;

    if current.attendance == Attendance::Cancelled {
        tracing::debug!("Linha {} está cancelada; edição ignorada", index);
        return Ok(EditOutcome::Locked(Notice::info("Cancelled classes cannot be edited.")));
    }

    let (mut updated, student_id) = apply_form(current, form, ctx)?;

    let request = single_request(&updated, Some(student_id));
    let notice = match backend.check_conflict(&request).await {
        Ok(Some(conflict)) => {
            updated.warning = conflict_message(&conflict);
            None
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Re-verificação da linha {} falhou: {}", index, e);
            updated.warning = CHECK_UNAVAILABLE.to_string();
            Some(Notice::error("Could not check conflicts for this class. Changes were saved."))
        }
    };

    rows[index] = updated;
    Ok(EditOutcome::Saved { index, notice })
}
