// src/error.rs
use crate::models::wizard::WizardStep;
use axum::{http::StatusCode, response::Html, response::IntoResponse};
use thiserror::Error;

/// Falhas ao falar com o backend REST.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Falha no pedido HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend respondeu {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Resposta inválida do backend: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro no backend: {0}")]
    Backend(#[from] BackendError),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Configuração inválida: {0}")]
    Config(String),

    /// Apanhado antes de qualquer chamada de rede.
    #[error("{0}")]
    Validation(String),

    #[error("Nenhum assistente aberto nesta sessão")]
    WizardClosed,

    #[error("Passo inesperado: esperado {expected:?}, atual {actual:?}")]
    WrongStep {
        expected: WizardStep,
        actual: WizardStep,
    },

    #[error("Linha {0} não existe")]
    RowNotFound(usize),

    #[error("Confirmação já em curso")]
    DuplicateSubmission,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    #[error("Erro ao renderizar template: {0}")]
    Template(#[from] askama::Error),
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Erro processado: {:?}", self);

        let (status, user_message) = match &self {
            AppError::Backend(_) => (StatusCode::BAD_GATEWAY, "The school server could not be reached.".to_string()),
            AppError::EnvVarError(_) | AppError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error.".to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::WizardClosed | AppError::WrongStep { .. } => {
                (StatusCode::CONFLICT, "The enrollment dialog is not at that step.".to_string())
            }
            AppError::RowNotFound(_) => (StatusCode::NOT_FOUND, "That schedule row does not exist.".to_string()),
            AppError::DuplicateSubmission => {
                (StatusCode::CONFLICT, "This enrollment is already being submitted.".to_string())
            }
            AppError::SessionError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Your session could not be read.".to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error.".to_string()),
        };

        (status, Html(format!(r#"
            <!DOCTYPE html><html><head><title>Error</title><style>body{{font-family:sans-serif;}}</style></head>
            <body><h1>Error {status_code}</h1><p>{message}</p><a href="/wizard">Back</a></body></html>
         "#, status_code=status.as_u16(), message=user_message))).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;
