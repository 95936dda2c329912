// src/services/conflict_service.rs
use crate::{
    models::{
        catalog::{resolve_student, Student},
        conflict::{ConflictBatchRequest, ConflictCheckRequest, ConflictDetail, ConflictProbe, ConflictType},
        notice::Notice,
        schedule::{teacher_ref, ScheduleRow, TimeRange},
    },
    services::{backend::Backend, editor_service::parse_row_date},
};

/// Aviso fixo quando a re-verificação de uma linha falha.
pub const CHECK_UNAVAILABLE: &str = "Unable to check conflicts";

/// Texto mostrado ao utilizador para cada tipo de conflito. Sem tradução.
pub fn conflict_message(conflict: &ConflictDetail) -> String {
    let course = &conflict.course_title;
    let teacher = &conflict.teacher_name;
    let student = &conflict.student_name;
    match conflict.conflict_type {
        ConflictType::Room => format!("Room conflict with {}", course),
        ConflictType::Teacher => format!("Teacher conflict with {}", teacher),
        ConflictType::Student => format!("Student conflict with {} in {}", student, course),
        ConflictType::RoomTeacher => format!("Room and teacher conflict with {} / {}", course, teacher),
        ConflictType::RoomStudent => format!("Room and student conflict with {} / {}", course, student),
        ConflictType::TeacherStudent => {
            format!("Teacher and student conflict with {} / {} in {}", teacher, student, course)
        }
        ConflictType::All => {
            format!("Room, teacher, and student conflict with {} / {} / {}", course, teacher, student)
        }
        ConflictType::Unknown => format!("Conflict with {}", course),
    }
}

/// Data igual, horários sobrepostos e, para `room`/`room_student`, a mesma sala.
pub fn row_matches(row: &ScheduleRow, conflict: &ConflictDetail) -> bool {
    // o backend pode mandar "2024-01-10T00:00:00Z" ou "2024-01-10 00:00:00"
    if parse_row_date(&conflict.date) != Some(row.date) {
        return false;
    }

    let Some(conflict_time) = TimeRange::parse(&format!("{}-{}", conflict.start_time, conflict.end_time)) else {
        return false;
    };
    if !row.time.overlaps(&conflict_time) {
        return false;
    }

    match conflict.conflict_type {
        ConflictType::Room | ConflictType::RoomStudent => row.room == conflict.room,
        ConflictType::Student => true,
        ConflictType::Unknown => {
            tracing::warn!(
                "Conflito de tipo desconhecido aceite só por sobreposição de horário ({} {})",
                conflict.date,
                row.time
            );
            true
        }
        other => {
            tracing::debug!("Conflito {:?} aceite só por sobreposição de horário", other);
            true
        }
    }
}

/// Escreve em cada linha o aviso do primeiro conflito que lhe corresponde (ou vazio).
pub fn merge_conflicts(rows: &mut [ScheduleRow], conflicts: &[ConflictDetail]) {
    for row in rows.iter_mut() {
        let warning = conflicts
            .iter()
            .find(|c| row_matches(&*row, c))
            .map(conflict_message)
            .unwrap_or_default();
        row.warning = warning;
    }
}

fn student_id_for(students: &[Student], label: &str) -> Option<String> {
    let found = resolve_student(students, label).map(|s| s.id.clone());
    if found.is_none() {
        tracing::warn!("Aluno '{}' não encontrado na lista desta execução", label);
    }
    found
}

pub fn batch_request(rows: &[ScheduleRow], students: &[Student]) -> ConflictBatchRequest {
    ConflictBatchRequest {
        schedules: rows
            .iter()
            .map(|row| ConflictProbe {
                date: row.date.format("%Y-%m-%d").to_string(),
                room: row.room.clone(),
                start_time: row.time.start_label(),
                end_time: row.time.end_label(),
                teacher_id: teacher_ref(row.teacher_id),
                student_id: student_id_for(students, &row.student),
            })
            .collect(),
    }
}

pub fn single_request(row: &ScheduleRow, student_id: Option<String>) -> ConflictCheckRequest {
    ConflictCheckRequest {
        date: row.date.format("%Y-%m-%d").to_string(),
        start_time: row.time.start_label(),
        end_time: row.time.end_label(),
        room: row.room.clone(),
        teacher_id: teacher_ref(row.teacher_id),
        student_id,
        exclude_id: None,
    }
}

/// Verifica todas as linhas num único pedido e anota os avisos.
///
/// Se o pedido falhar as linhas ficam sem aviso e devolve-se um toast de erro;
/// a geração nunca é interrompida.
pub async fn annotate_rows<B: Backend>(
    backend: &B,
    rows: &mut [ScheduleRow],
    students: &[Student],
) -> Option<Notice> {
    if rows.is_empty() {
        return None;
    }

    let request = batch_request(rows, students);
    match backend.check_conflicts(&request).await {
        Ok(conflicts) => {
            tracing::debug!("{} conflitos recebidos para {} linhas", conflicts.len(), rows.len());
            merge_conflicts(rows, &conflicts);
            let flagged = rows.iter().filter(|r| r.has_warning()).count();
            (flagged > 0).then(|| Notice::warning(format!("{} class(es) have scheduling conflicts.", flagged)))
        }
        Err(e) => {
            tracing::warn!("Verificação de conflitos em lote falhou: {}", e);
            for row in rows.iter_mut() {
                row.warning.clear();
            }
            Some(Notice::error("Could not check schedule conflicts. Rows are shown without warnings."))
        }
    }
}
