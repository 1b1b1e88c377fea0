use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use legitrack_store::lock;
use serde_json::Value;
use tracing::info;

use crate::auth::auth_user_id;
use crate::error::ApiError;
use crate::models::{InterestsRequest, InterestsResponse};
use crate::state::AppState;

const NO_CODES: &str = "Nenhum código de tema foi enviado";

/// `POST /projeto/interesses`. Replaces the caller's saved themes.
pub async fn save_interests(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<InterestsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InterestsResponse>), ApiError> {
    let user_id = auth_user_id(&state, &headers)?;

    let codes = payload
        .ok()
        .and_then(|Json(body)| body.codigos)
        .filter(|codes| !codes.is_empty())
        .ok_or_else(|| ApiError::bad_request(NO_CODES))?;
    let themes = codes
        .iter()
        .map(theme_code)
        .collect::<Result<Vec<i64>, ApiError>>()?;

    let saved = {
        let mut store = lock(&state.store)?;
        let unknown = store.unknown_themes(&themes)?;
        if !unknown.is_empty() {
            let list: Vec<String> = unknown.iter().map(i64::to_string).collect();
            return Err(ApiError::bad_request(format!(
                "temas desconhecidos: {}",
                list.join(", ")
            )));
        }
        store.set_interests(user_id, &themes)?;
        store.interests(user_id)?
    };
    info!(user = user_id, themes = saved.len(), "interests saved");

    Ok((
        StatusCode::CREATED,
        Json(InterestsResponse {
            mensagem: Some("Interesses salvos com sucesso".to_string()),
            temas_selecionados: saved,
        }),
    ))
}

/// `GET /projeto/interesses`.
pub async fn list_interests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InterestsResponse>, ApiError> {
    let user_id = auth_user_id(&state, &headers)?;
    let saved = lock(&state.store)?.interests(user_id)?;
    Ok(Json(InterestsResponse {
        mensagem: None,
        temas_selecionados: saved,
    }))
}

fn theme_code(value: &Value) -> Result<i64, ApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::bad_request(format!("código de tema inválido: {value}")))
}
