use std::sync::Arc;

use axum::{Json, extract::State};
use presence::data::WelcomeResponse;

const WELCOME: &str = "Bienvenido a la API de Control de Sesion.";

/// Handle the `/` and `/welcome` routes
pub async fn get(State(state): State<Arc<crate::AppState>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME.to_string(),
        author: state.author.clone(),
    })
}
