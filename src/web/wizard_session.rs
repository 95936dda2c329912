// src/web/wizard_session.rs
//! O estado do assistente e os toasts pendentes vivem na sessão do browser.

use crate::{
    error::{AppError, AppResult},
    models::{notice::Notice, wizard::WizardState},
};
use tower_sessions::Session;

const WIZARD_KEY: &str = "wizard";
const NOTICES_KEY: &str = "notices";

/// Sem assistente guardado = assistente fechado.
pub async fn load_wizard(session: &Session) -> AppResult<WizardState> {
    session
        .get::<WizardState>(WIZARD_KEY)
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| AppError::SessionError(format!("Falha ao ler assistente: {}", e)))
}

pub async fn save_wizard(session: &Session, state: &WizardState) -> AppResult<()> {
    if !state.is_open() {
        session
            .remove::<WizardState>(WIZARD_KEY)
            .await
            .map_err(|e| AppError::SessionError(format!("Falha ao limpar assistente: {}", e)))?;
        return Ok(());
    }
    session
        .insert(WIZARD_KEY, state)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao guardar assistente: {}", e)))
}

/// Grava já no store, sem esperar pelo fim do pedido.
pub async fn persist(session: &Session) -> AppResult<()> {
    session
        .save()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao gravar sessão: {}", e)))
}

pub async fn push_notice(session: &Session, notice: Notice) -> AppResult<()> {
    let mut pending = session
        .get::<Vec<Notice>>(NOTICES_KEY)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao ler avisos: {}", e)))?
        .unwrap_or_default();
    pending.push(notice);
    session
        .insert(NOTICES_KEY, pending)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao guardar avisos: {}", e)))
}

/// Devolve e apaga os toasts pendentes (mostrados uma única vez).
pub async fn take_notices(session: &Session) -> AppResult<Vec<Notice>> {
    session
        .remove::<Vec<Notice>>(NOTICES_KEY)
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| AppError::SessionError(format!("Falha ao ler avisos: {}", e)))
}
