use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use legitrack_core::ReferenceKind;
use legitrack_store::{BillFilter, StoreError, lock};

use crate::error::ApiError;
use crate::models::{
    BillDetailResponse, BillListResponse, BillSummaryView, ThemeListResponse, TrackingView,
};
use crate::state::AppState;

const MAX_PER_PAGE: u32 = 100;

/// `GET /projetos?pagina=&itens=&tema=..`. `tema` may repeat; a bill matches
/// when it is linked to any of the listed themes.
pub async fn list_bills(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<BillListResponse>, ApiError> {
    let filter = parse_list_query(query.as_deref().unwrap_or_default())?;
    let page = lock(&state.store)?.list_bills(&filter)?;
    Ok(Json(BillListResponse {
        pagina: filter.page,
        itens: filter.per_page,
        total: page.total,
        dados: page.bills.into_iter().map(BillSummaryView::from).collect(),
    }))
}

/// `GET /projetos/:id`.
pub async fn bill_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BillDetailResponse>, ApiError> {
    let id = parse_int::<i64>("id", &id)?;
    let bill = lock(&state.store)?
        .get_bill(id)
        .map_err(|e| not_found_bill(e, id))?;
    Ok(Json(bill.into()))
}

/// `GET /projetos/:id/tramitacoes` and `GET /projetos/tramitacoes/:id`.
pub async fn bill_tracking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TrackingView>>, ApiError> {
    let id = parse_int::<i64>("id", &id)?;
    let rows = lock(&state.store)?
        .tracking_history(id)
        .map_err(|e| not_found_bill(e, id))?;
    Ok(Json(rows.into_iter().map(TrackingView::from).collect()))
}

/// `GET /projetos/temas`.
pub async fn list_themes(
    State(state): State<AppState>,
) -> Result<Json<ThemeListResponse>, ApiError> {
    let themes = lock(&state.store)?.list_references(ReferenceKind::Theme)?;
    Ok(Json(ThemeListResponse {
        total_de_temas: themes.len(),
        temas: themes
            .into_iter()
            .map(|t| format!("Nome: {} - Cod: {}", t.description, t.id))
            .collect(),
    }))
}

fn not_found_bill(err: StoreError, id: i64) -> ApiError {
    match err {
        StoreError::NoResults => ApiError::not_found(format!("bill {id} not found")),
        other => other.into(),
    }
}

pub(crate) fn parse_list_query(raw: &str) -> Result<BillFilter, ApiError> {
    let mut filter = BillFilter::default();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "tema" => filter.themes.push(parse_int("tema", &value)?),
            "pagina" => filter.page = parse_int("pagina", &value)?,
            "itens" => filter.per_page = parse_int("itens", &value)?,
            _ => {}
        }
    }
    if filter.page < 1 {
        return Err(ApiError::bad_request("pagina must be at least 1"));
    }
    if !(1..=MAX_PER_PAGE).contains(&filter.per_page) {
        return Err(ApiError::bad_request(format!(
            "itens must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok(filter)
}

pub(crate) fn parse_int<T: FromStr>(name: &str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{name} must be an integer, got {raw:?}")))
}
