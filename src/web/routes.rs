// src/web/routes.rs
use crate::{
    state::AppState,
    web::{lookup_handlers, wizard_handlers},
};
use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Assistente de matrícula ---
    let wizard_routes = Router::new()
        // Entradas: nova matrícula, resgate de pacote, atribuição de curso, troca de horário
        .route("/start", post(wizard_handlers::start))
        .route("/start/package/{id}", post(wizard_handlers::start_package))
        .route("/start/assign/{session_id}", post(wizard_handlers::start_assign))
        .route("/start/swap/{session_id}", post(wizard_handlers::start_swap))
        // Passos
        .route("/course", post(wizard_handlers::submit_course))
        .route("/schedule", post(wizard_handlers::submit_schedule))
        .route("/teacher", post(wizard_handlers::submit_teacher))
        .route("/back", post(wizard_handlers::back))
        .route("/cancel", post(wizard_handlers::cancel))
        // Editor de linha (índice na tabela de confirmação)
        .route(
            "/rows/{index}/edit",
            get(wizard_handlers::edit_row_form).post(wizard_handlers::edit_row_save),
        )
        .route("/confirm", post(wizard_handlers::confirm));

    // --- Listas JSON ---
    let api_routes = Router::new()
        .route("/courses/{id}/teachers", get(lookup_handlers::course_teachers))
        .route("/rooms", get(lookup_handlers::rooms))
        .route("/class-options", get(lookup_handlers::class_options));

    Router::new()
        .route("/", get(|| async { Redirect::permanent("/wizard") }))
        .route("/wizard", get(wizard_handlers::show_wizard))
        .nest("/wizard", wizard_routes)
        .nest("/api", api_routes)
        .with_state(app_state)
}
