// src/models/catalog.rs
use serde::{Deserialize, Serialize};

/// Id usado pelo backend (e pelos formulários) para "nada selecionado".
pub const NO_SELECTION: i64 = -1;

// --- Estruturas que espelham as respostas do backend ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
}

impl Course {
    /// Um curso só conta como escolhido com id real e título preenchido.
    pub fn is_selected(&self) -> bool {
        self.id != NO_SELECTION && !self.title.trim().is_empty()
    }
}

/// Tipo de turma (preço/capacidade). Vem de `GET class-options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOption {
    pub id: i64,
    pub class_mode: String,
    #[serde(default)]
    pub class_limit: i64,
    #[serde(default)]
    pub tuition_fee: f64,
}

impl ClassOption {
    pub fn kind(&self) -> ClassKind {
        ClassKind::from_mode(&self.class_mode)
    }

    /// Número à cabeça do modo: "12 times fixed" -> 12, "5 days camp" -> 5.
    pub fn session_count(&self) -> Option<usize> {
        let digits: String = self
            .class_mode
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().filter(|n| *n > 0)
    }
}

/// Etiqueta resolvida uma única vez a partir do `classMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Dias da semana fixos, N ocorrências por dia escolhido.
    Fixed,
    /// Lista explícita de datas.
    Camp,
    /// Aulas marcadas avulso mais tarde; professor pode ficar TBD.
    Check,
    Flexible,
}

impl ClassKind {
    pub fn from_mode(mode: &str) -> Self {
        let mode = mode.to_ascii_lowercase();
        if mode.contains("check") {
            ClassKind::Check
        } else if mode.contains("camp") {
            ClassKind::Camp
        } else if mode.contains("fixed") {
            ClassKind::Fixed
        } else {
            ClassKind::Flexible
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassKind::Fixed => "fixed",
            ClassKind::Camp => "camp",
            ClassKind::Check => "check",
            ClassKind::Flexible => "flexible",
        }
    }

    pub fn teacher_optional(&self) -> bool {
        matches!(self, ClassKind::Check)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl Student {
    /// Nome mostrado nas linhas: apelido se existir, senão o nome.
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref().map(str::trim) {
            Some(nick) if !nick.is_empty() => nick,
            _ => &self.name,
        }
    }
}

/// Procura o aluno pelo texto mostrado na linha: apelido primeiro, depois nome, depois id.
pub fn resolve_student<'a>(students: &'a [Student], label: &str) -> Option<&'a Student> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    students
        .iter()
        .find(|s| s.nickname.as_deref().map(str::trim) == Some(label))
        .or_else(|| students.iter().find(|s| s.name.trim() == label))
        .or_else(|| students.iter().find(|s| s.id == label))
}

/// Pacote pré-pago que pode ser resgatado num curso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: i64,
    pub student_id: String,
    pub class_option_id: i64,
    pub class_mode: String,
    #[serde(default)]
    pub class_limit: i64,
    #[serde(default)]
    pub tuition_fee: f64,
}

impl Package {
    pub fn class_option(&self) -> ClassOption {
        ClassOption {
            id: self.class_option_id,
            class_mode: self.class_mode.clone(),
            class_limit: self.class_limit,
            tuition_fee: self.tuition_fee,
        }
    }
}

/// Sessão (matrícula) já existente no backend, usada nos modos de atribuição e troca.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingSession {
    pub id: i64,
    pub student_id: String,
    pub course_id: i64,
    #[serde(default)]
    pub course_title: String,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    pub class_option_id: i64,
}
