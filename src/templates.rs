// src/templates.rs
use askama::Template; // Trait necessário para Askama
use crate::{
    models::{
        catalog::{ClassKind, ClassOption, Room, Teacher, NO_SELECTION},
        notice::Notice,
        schedule::{Attendance, DaySelection, ScheduleRow, TBD},
        wizard::{WizardState, WizardStep},
    },
    services::editor_service::RowEditForm,
};

/// Uma `<option>` já resolvida (o template não compara nada).
#[derive(Clone, Debug)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self { value: value.to_string(), label: label.into(), selected }
    }
}

/// Listas carregadas do backend para o passo atual (vazias se a busca falhou).
#[derive(Clone, Debug, Default)]
pub struct StepLookups {
    pub class_options: Vec<ClassOption>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
}

fn teacher_options(teachers: &[Teacher], selected: i64, allow_tbd: bool) -> Vec<SelectOption> {
    let mut options = Vec::with_capacity(teachers.len() + 1);
    if allow_tbd {
        options.push(SelectOption::new(NO_SELECTION, TBD, selected == NO_SELECTION));
    }
    options.extend(teachers.iter().map(|t| SelectOption::new(t.id, t.name.clone(), t.id == selected)));
    options
}

/// A sala atual entra sempre na lista, mesmo que a busca de salas tenha falhado.
fn room_options(rooms: &[Room], selected: &str) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = rooms
        .iter()
        .map(|r| SelectOption::new(&r.name, r.name.clone(), r.name == selected))
        .collect();
    if !selected.is_empty() && !options.iter().any(|o| o.selected) {
        options.insert(0, SelectOption::new(selected, selected, true));
    }
    options
}

/// Linha da tabela de confirmação, já formatada.
#[derive(Clone, Debug)]
pub struct RowView {
    pub index: usize,
    pub class_number: u32,
    pub date: String,
    pub time: String,
    pub student: String,
    pub teacher: String,
    pub room: String,
    pub remark: String,
    pub warning: String,
    pub attendance: &'static str,
    pub has_warning: bool,
    pub locked: bool,
}

impl RowView {
    pub fn new(index: usize, row: &ScheduleRow) -> Self {
        Self {
            index,
            class_number: row.class_number,
            date: row.date.format("%Y-%m-%d (%a)").to_string(),
            time: row.time.to_string(),
            student: row.student.clone(),
            teacher: row.teacher.clone(),
            room: row.room.clone(),
            remark: row.remark.clone(),
            warning: row.warning.clone(),
            attendance: row.attendance.as_str(),
            has_warning: row.has_warning(),
            locked: row.attendance == Attendance::Cancelled,
        }
    }
}

#[derive(Template)]
#[template(path = "wizard.html")]
pub struct WizardPage {
    pub step: &'static str,
    pub variant: &'static str,
    pub notices: Vec<Notice>,
    pub course_id: i64,
    pub course_title: String,
    pub student_names: String,
    pub can_go_back: bool,
    // passo "schedule"
    pub class_options: Vec<SelectOption>,
    pub days: String,
    pub dates: String,
    pub start_time: String,
    pub end_time: String,
    // passo "teacher"
    pub teachers: Vec<SelectOption>,
    pub rooms: Vec<SelectOption>,
    pub remark: String,
    // passo "confirm"
    pub rows: Vec<RowView>,
    pub conflict_count: usize,
    pub submitting: bool,
}

impl WizardPage {
    /// Preenche a página a partir do estado; as listas dinâmicas são passadas à parte.
    pub fn from_state(state: &WizardState, lookups: &StepLookups, notices: Vec<Notice>, submitting: bool) -> Self {
        let (days, dates, start_time, end_time) = match state.class_schedule.as_ref().map(|s| &s.selection) {
            Some(DaySelection::Fixed { days, start_time, end_time }) => (
                days.iter().map(|d| d.to_string().to_lowercase()).collect::<Vec<_>>().join(","),
                String::new(),
                start_time.format("%H:%M").to_string(),
                end_time.format("%H:%M").to_string(),
            ),
            Some(DaySelection::Camp { dates, start_time, end_time }) => (
                String::new(),
                dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect::<Vec<_>>().join(","),
                start_time.format("%H:%M").to_string(),
                end_time.format("%H:%M").to_string(),
            ),
            _ => (String::new(), String::new(), String::new(), String::new()),
        };

        let rows: Vec<RowView> = state.rows.iter().enumerate().map(|(i, r)| RowView::new(i, r)).collect();
        let conflict_count = rows.iter().filter(|r| r.has_warning).count();

        let selected_option_id = state.class_schedule.as_ref().map(|s| s.class_option.id).unwrap_or(NO_SELECTION);
        let class_options = lookups
            .class_options
            .iter()
            .map(|o| SelectOption::new(o.id, o.class_mode.clone(), o.id == selected_option_id))
            .collect();
        let allow_tbd = state.class_schedule.as_ref().is_some_and(|s| s.kind == ClassKind::Check);
        let selected_teacher_id = state.teacher_data.as_ref().map(|t| t.teacher_id).unwrap_or(NO_SELECTION);
        let room = state.teacher_data.as_ref().map(|t| t.room.as_str()).unwrap_or_default();

        Self {
            step: state.step.as_str(),
            variant: state.variant.label(),
            notices,
            course_id: state.course.as_ref().map(|c| c.id).unwrap_or(NO_SELECTION),
            course_title: state.course.as_ref().map(|c| c.title.clone()).unwrap_or_default(),
            student_names: state
                .students
                .iter()
                .map(|s| s.display_name())
                .collect::<Vec<_>>()
                .join(", "),
            can_go_back: state.step != WizardStep::Closed && state.step != state.variant.first_step(),
            class_options,
            days,
            dates,
            start_time,
            end_time,
            teachers: teacher_options(&lookups.teachers, selected_teacher_id, allow_tbd),
            rooms: room_options(&lookups.rooms, room),
            remark: state.teacher_data.as_ref().map(|t| t.remark.clone()).unwrap_or_default(),
            rows,
            conflict_count,
            submitting,
        }
    }
}

#[derive(Template)]
#[template(path = "row_editor.html")]
pub struct RowEditorPage {
    pub index: usize,
    pub form: RowEditForm,
    pub teachers: Vec<SelectOption>,
    pub rooms: Vec<SelectOption>,
    pub attendance_options: Vec<SelectOption>,
    pub notices: Vec<Notice>,
}

impl RowEditorPage {
    pub fn new(index: usize, form: RowEditForm, lookups: &StepLookups, allow_tbd: bool, notices: Vec<Notice>) -> Self {
        let attendance_options = Attendance::ALL
            .iter()
            .map(|a| SelectOption::new(a.as_str(), a.as_str(), a.as_str() == form.attendance))
            .collect();
        Self {
            index,
            teachers: teacher_options(&lookups.teachers, form.teacher_id, allow_tbd),
            rooms: room_options(&lookups.rooms, &form.room),
            attendance_options,
            form,
            notices,
        }
    }
}
