mod auth;
mod bills;
mod interests;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use legitrack_store::lock;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projetos", get(bills::list_bills))
        .route("/projetos/temas", get(bills::list_themes))
        .route("/projetos/:id", get(bills::bill_detail))
        .route("/projetos/:id/tramitacoes", get(bills::bill_tracking))
        .route("/projetos/tramitacoes/:id", get(bills::bill_tracking))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/projeto/interesses",
            post(interests::save_interests).get(interests::list_interests),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    lock(&state.store)?.ping()?;
    Ok(Json(json!({"status": "ok"})))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use chrono::NaiveDate;
    use legitrack_core::{BillRecord, BillStatus, ReferenceItem, ReferenceKind, TrackingEntry};
    use legitrack_store::{BillSync, DuckStore, ReferenceChanges, shared};

    use crate::state::AppState;

    pub fn empty_state() -> AppState {
        AppState::new(shared(DuckStore::open().unwrap()), Duration::from_secs(3600))
    }

    fn items(rows: &[(i64, &str)]) -> ReferenceChanges {
        ReferenceChanges {
            inserts: rows
                .iter()
                .map(|&(id, ds)| ReferenceItem {
                    id,
                    description: ds.into(),
                })
                .collect(),
            updates: vec![],
        }
    }

    fn at(month: u32, day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(id: i64, title: Option<&str>) -> BillRecord {
        BillRecord {
            id,
            title: title.map(str::to_owned),
            label: format!("PL {id}/2024"),
            start_year: Some(2024),
        }
    }

    /// Three bills: 1 (March, themes 40+42, two tracking rows), 2 (no title,
    /// no status), 3 (May, theme 40, archived).
    pub fn seeded_state() -> AppState {
        let mut store = DuckStore::open().unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::Situation,
                &items(&[(1120, "Aguardando Parecer"), (1140, "Arquivada")]),
            )
            .unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::TrackingType,
                &items(&[(100, "Apresentação de Proposição")]),
            )
            .unwrap();
        store
            .apply_reference_changes(
                ReferenceKind::Theme,
                &items(&[(40, "Educação"), (42, "Direitos Humanos")]),
            )
            .unwrap();

        store
            .write_bill(&BillSync {
                record: record(1, Some("Dispõe sobre escolas.")),
                status: Some(BillStatus {
                    at: at(3, 5, 10),
                    organ: Some("CE".into()),
                    dispatch: Some("Aprovado o parecer.".into()),
                    situation_id: Some(1120),
                    tracking_type_id: Some(100),
                }),
                tracking: vec![
                    TrackingEntry {
                        sequence: 1,
                        at: at(2, 1, 9),
                        organ: Some("PLEN".into()),
                        dispatch: None,
                        situation_id: None,
                        tracking_type_id: Some(100),
                    },
                    TrackingEntry {
                        sequence: 2,
                        at: at(3, 5, 10),
                        organ: Some("CE".into()),
                        dispatch: Some("Aprovado o parecer.".into()),
                        situation_id: Some(1120),
                        tracking_type_id: Some(100),
                    },
                ],
                themes: vec![40, 42],
            })
            .unwrap();
        store
            .write_bill(&BillSync {
                record: record(2, None),
                status: None,
                tracking: vec![],
                themes: vec![],
            })
            .unwrap();
        store
            .write_bill(&BillSync {
                record: record(3, Some("Institui o programa.")),
                status: Some(BillStatus {
                    at: at(5, 1, 12),
                    organ: None,
                    dispatch: None,
                    situation_id: Some(1140),
                    tracking_type_id: None,
                }),
                tracking: vec![],
                themes: vec![40],
            })
            .unwrap();

        AppState::new(shared(store), Duration::from_secs(3600))
    }
}
