// src/state.rs
use crate::services::backend::HttpBackend;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// Execuções do assistente com uma confirmação em curso.
///
/// Impede que dois cliques (ou dois separadores) submetam a mesma execução em paralelo.
/// Usa `std::sync::Mutex` porque o guard liberta a entrada no `Drop`.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    runs: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightRegistry {
    /// `None` se a execução já estiver a ser submetida.
    pub fn try_begin(&self, run_id: Uuid) -> Option<InFlightGuard> {
        let mut runs = self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !runs.insert(run_id) {
            tracing::warn!("Confirmação duplicada ignorada para a execução {}", run_id);
            return None;
        }
        Some(InFlightGuard { runs: self.runs.clone(), run_id })
    }

    pub fn is_in_flight(&self, run_id: Uuid) -> bool {
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&run_id)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    runs: Arc<Mutex<HashSet<Uuid>>>,
    run_id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.runs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.run_id);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<HttpBackend>,
    pub in_flight: InFlightRegistry,
}
