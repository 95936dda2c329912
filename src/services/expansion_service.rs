// src/services/expansion_service.rs
use crate::models::{
    catalog::Student,
    schedule::{Attendance, ClassSchedule, DaySelection, ScheduleRow, TeacherData, TimeRange},
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Ocorrências por dia da semana quando o modo não traz número.
pub const DEFAULT_FIXED_OCCURRENCES: usize = 12;

/// Ocorrências (data + horário) da seleção, já por ordem de data.
///
/// Fixo: as próximas N datas de cada dia escolhido a partir de `today` (inclusive),
/// intercaladas por data. Campo: as datas tal como o utilizador as escolheu.
/// Check/flexível: nenhuma.
pub fn occurrences(schedule: &ClassSchedule, today: NaiveDate) -> Vec<(NaiveDate, TimeRange)> {
    match &schedule.selection {
        DaySelection::Fixed { days, start_time, end_time } => {
            let per_day = schedule
                .class_option
                .session_count()
                .unwrap_or(DEFAULT_FIXED_OCCURRENCES);
            let range = TimeRange::new(*start_time, *end_time);

            let mut unique_days: Vec<Weekday> = Vec::with_capacity(days.len());
            for day in days {
                if !unique_days.contains(day) {
                    unique_days.push(*day);
                }
            }

            let mut dates: Vec<NaiveDate> = unique_days
                .iter()
                .flat_map(|day| weekly_dates(today, *day, per_day))
                .collect();
            dates.sort();
            dates.into_iter().map(|d| (d, range)).collect()
        }
        DaySelection::Camp { dates, start_time, end_time } => {
            let range = TimeRange::new(*start_time, *end_time);
            dates.iter().map(|d| (*d, range)).collect()
        }
        DaySelection::Open => Vec::new(),
    }
}

/// Primeira data >= `from` que cai em `day`, e as `count - 1` semanas seguintes.
fn weekly_dates(from: NaiveDate, day: Weekday, count: usize) -> impl Iterator<Item = NaiveDate> {
    let offset = (7 + day.num_days_from_monday() as i64 - from.weekday().num_days_from_monday() as i64) % 7;
    let first = from + Duration::days(offset);
    (0..count as i64).map(move |week| first + Duration::weeks(week))
}

/// Uma linha por aluno × ocorrência; `class` recomeça em 1 para cada aluno.
///
/// Dias/datas vazios são rejeitados pelo assistente antes de chegar aqui.
pub fn expand_rows(
    schedule: &ClassSchedule,
    students: &[Student],
    teacher: &TeacherData,
    today: NaiveDate,
) -> Vec<ScheduleRow> {
    let slots = occurrences(schedule, today);
    let mut rows = Vec::with_capacity(slots.len() * students.len());

    for student in students {
        for (index, (date, time)) in slots.iter().enumerate() {
            rows.push(ScheduleRow {
                date: *date,
                time: *time,
                student: student.display_name().to_string(),
                teacher: teacher.teacher.clone(),
                teacher_id: teacher.teacher_id,
                room: teacher.room.clone(),
                remark: teacher.remark.clone(),
                warning: String::new(),
                attendance: Attendance::Pending,
                class_number: index as u32 + 1,
            });
        }
    }

    tracing::debug!(
        "Expansão {}: {} ocorrências x {} alunos = {} linhas",
        schedule.kind.as_str(),
        slots.len(),
        students.len(),
        rows.len()
    );
    rows
}
