// src/models/wizard.rs
use crate::models::{
    catalog::{Course, ExistingSession, Package, Student},
    schedule::{ClassSchedule, ScheduleRow, TeacherData},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Closed,
    Course,
    Schedule,
    Teacher,
    Confirm,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Closed => "closed",
            WizardStep::Course => "course",
            WizardStep::Schedule => "schedule",
            WizardStep::Teacher => "teacher",
            WizardStep::Confirm => "confirm",
        }
    }
}

/// As quatro entradas do assistente. Todas acabam no mesmo ecrã de confirmação.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum WizardVariant {
    /// Cartão de curso ou "adicionar curso" no detalhe do aluno.
    #[default]
    NewEnrollment,
    PackageRedemption { package: Package },
    /// Sessão provisória (TBC) que recebe agora o curso definitivo.
    CourseAssignment { session: ExistingSession },
    /// Curso fixo, troca-se apenas o horário.
    ScheduleSwap { session: ExistingSession },
}

impl WizardVariant {
    pub fn label(&self) -> &'static str {
        match self {
            WizardVariant::NewEnrollment => "New enrollment",
            WizardVariant::PackageRedemption { .. } => "Package redemption",
            WizardVariant::CourseAssignment { .. } => "Course assignment",
            WizardVariant::ScheduleSwap { .. } => "Schedule swap",
        }
    }

    /// Sessão já existente que a confirmação atualiza em vez de criar.
    pub fn existing_session(&self) -> Option<&ExistingSession> {
        match self {
            WizardVariant::CourseAssignment { session } | WizardVariant::ScheduleSwap { session } => {
                Some(session)
            }
            _ => None,
        }
    }

    pub fn first_step(&self) -> WizardStep {
        match self {
            WizardVariant::ScheduleSwap { .. } => WizardStep::Schedule,
            _ => WizardStep::Course,
        }
    }
}

/// Estado acumulado de uma execução do assistente. Vive na sessão do browser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub run_id: Uuid,
    pub variant: WizardVariant,
    pub step: WizardStep,
    pub course: Option<Course>,
    pub class_schedule: Option<ClassSchedule>,
    pub teacher_data: Option<TeacherData>,
    pub students: Vec<Student>,
    pub rows: Vec<ScheduleRow>,
    /// Alguma linha foi alterada no editor desde que foram geradas.
    #[serde(default)]
    pub rows_edited: bool,
    /// aluno -> sessão já criada nesta execução (reaproveitado se a confirmação for repetida)
    pub created_sessions: BTreeMap<String, i64>,
    pub package_applied: bool,
    /// Página a recarregar depois de confirmar.
    pub return_to: String,
}

impl WizardState {
    pub fn is_open(&self) -> bool {
        self.step != WizardStep::Closed
    }
}
