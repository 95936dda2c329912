// src/models/conflict.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Room,
    Teacher,
    Student,
    RoomTeacher,
    RoomStudent,
    TeacherStudent,
    All,
    /// Qualquer valor que o backend envie e que não conhecemos.
    #[serde(other)]
    Unknown,
}

/// Conflito devolvido pelo backend. Só o mostramos, nunca o inventamos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetail {
    pub conflict_type: ConflictType,
    #[serde(default)]
    pub course_title: String,
    #[serde(default)]
    pub teacher_name: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub room: String,
}

/// Pedido de verificação de uma única linha (`POST schedules/conflict`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_id: Option<i64>,
}

/// Um elemento do lote (`POST schedules/conflicts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictProbe {
    pub date: String,
    pub room: String,
    pub start_time: String,
    pub end_time: String,
    pub teacher_id: Option<i64>,
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictBatchRequest {
    pub schedules: Vec<ConflictProbe>,
}
