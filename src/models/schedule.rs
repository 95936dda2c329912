// src/models/schedule.rs
use crate::models::catalog::{ClassKind, ClassOption, NO_SELECTION};
use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TBD: &str = "TBD";

// --- Intervalo horário "HH:MM - HH:MM" ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Aceita "10:00 - 11:00" e "10:00-11:00".
    pub fn parse(text: &str) -> Option<Self> {
        let (start, end) = text.split_once('-')?;
        Some(Self::new(parse_clock(start)?, parse_clock(end)?))
    }

    pub fn start_label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format("%H:%M").to_string()
    }

    /// Intervalo semiaberto, em minutos desde a meia-noite: encostar não conta.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        minutes(self.start) < minutes(other.end) && minutes(other.start) < minutes(self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_label(), self.end_label())
    }
}

fn minutes(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// "HH:MM" (ou "HH:MM:SS") para `NaiveTime`.
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

// --- Presença ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    #[default]
    Pending,
    Present,
    Absent,
    Cancelled,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Pending => "pending",
            Attendance::Present => "present",
            Attendance::Absent => "absent",
            Attendance::Cancelled => "cancelled",
        }
    }

    pub const ALL: [Attendance; 4] = [
        Attendance::Pending,
        Attendance::Present,
        Attendance::Absent,
        Attendance::Cancelled,
    ];
}

impl FromStr for Attendance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(Attendance::Pending),
            "present" => Ok(Attendance::Present),
            "absent" => Ok(Attendance::Absent),
            "cancelled" | "canceled" => Ok(Attendance::Cancelled),
            other => Err(format!("Unknown attendance status '{}'", other)),
        }
    }
}

// --- Professor/sala recolhidos uma vez por execução do assistente ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherData {
    pub teacher: String,
    /// `-1` = ainda por atribuir (TBD).
    pub teacher_id: i64,
    pub room: String,
    #[serde(default)]
    pub remark: String,
}

impl TeacherData {
    pub fn tbd() -> Self {
        Self {
            teacher: TBD.to_string(),
            teacher_id: NO_SELECTION,
            room: TBD.to_string(),
            remark: String::new(),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.teacher_id == NO_SELECTION
    }
}

// --- Seleção de dias/datas ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DaySelection {
    Fixed {
        days: Vec<Weekday>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    Camp {
        dates: Vec<NaiveDate>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    /// Check/flexível: sem dias, as aulas são marcadas depois.
    Open,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchedule {
    pub class_option: ClassOption,
    pub kind: ClassKind,
    pub selection: DaySelection,
}

impl ClassSchedule {
    pub fn new(class_option: ClassOption, selection: DaySelection) -> Self {
        let kind = class_option.kind();
        Self { class_option, kind, selection }
    }

    /// Horário por omissão para resgates "check": nada a expandir.
    pub fn open(class_option: ClassOption) -> Self {
        Self::new(class_option, DaySelection::Open)
    }
}

// --- A linha de agenda ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    pub date: NaiveDate,
    pub time: TimeRange,
    /// Apelido ou nome do aluno, tal como aparece na tabela.
    pub student: String,
    pub teacher: String,
    pub teacher_id: i64,
    pub room: String,
    pub remark: String,
    /// Vazio = sem conflito.
    pub warning: String,
    pub attendance: Attendance,
    #[serde(rename = "class")]
    pub class_number: u32,
}

impl ScheduleRow {
    pub fn has_warning(&self) -> bool {
        !self.warning.is_empty()
    }
}

// --- Payloads enviados ao backend ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub student_id: String,
    pub course_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    pub class_option_id: i64,
    pub class_cancel: i64,
    pub payment: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_from_package: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub course_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    pub class_option_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub session_id: i64,
    pub course_id: i64,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
    pub remark: String,
    pub attendance: Attendance,
    pub feedback: String,
    pub verify_fb: bool,
    pub class_number: u32,
    pub warning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkCreated {
    pub created: usize,
}

/// `-1` nunca vai para o backend: vira campo omitido.
pub fn teacher_ref(teacher_id: i64) -> Option<i64> {
    (teacher_id != NO_SELECTION).then_some(teacher_id)
}
