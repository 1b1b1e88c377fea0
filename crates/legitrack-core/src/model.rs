//! Domain types shared by the store, the sync worker, and the HTTP API.

use chrono::NaiveDateTime;

/// One of the three code tables published under `referencias/proposicoes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Bill situations (`codSituacao`).
    Situation,
    /// Tracking (procedure) types (`codTipoTramitacao`).
    TrackingType,
    /// Subject themes (`codTema`).
    Theme,
}

impl ReferenceKind {
    /// Sync order. Themes must exist before bills are linked to them.
    pub const ALL: [ReferenceKind; 3] = [
        ReferenceKind::Situation,
        ReferenceKind::TrackingType,
        ReferenceKind::Theme,
    ];

    /// Fully-qualified table name.
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Situation => "camara.tp_situacao",
            ReferenceKind::TrackingType => "camara.tp_tramitacao",
            ReferenceKind::Theme => "camara.tp_temas",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            ReferenceKind::Situation => "id_situacao",
            ReferenceKind::TrackingType => "id_tramitacao",
            ReferenceKind::Theme => "id_tema",
        }
    }

    pub fn description_column(self) -> &'static str {
        match self {
            ReferenceKind::Situation => "ds_situacao",
            ReferenceKind::TrackingType => "ds_tramitacao",
            ReferenceKind::Theme => "ds_tema",
        }
    }

    /// Path of the remote endpoint, relative to the API base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            ReferenceKind::Situation => "referencias/proposicoes/codSituacao",
            ReferenceKind::TrackingType => "referencias/proposicoes/codTipoTramitacao",
            ReferenceKind::Theme => "referencias/proposicoes/codTema",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// A row of a reference table: remote code plus its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceItem {
    pub id: i64,
    pub description: String,
}

/// Listing-level fields of a bill, as written by the sync worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillRecord {
    pub id: i64,
    pub title: Option<String>,
    /// Short label such as `PL 1234/2023`.
    pub label: String,
    pub start_year: Option<i32>,
}

/// Latest known status of a bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillStatus {
    pub at: NaiveDateTime,
    pub organ: Option<String>,
    pub dispatch: Option<String>,
    pub situation_id: Option<i64>,
    pub tracking_type_id: Option<i64>,
}

/// One step of a bill's tracking history. `sequence` is unique per bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEntry {
    pub sequence: i64,
    pub at: NaiveDateTime,
    pub organ: Option<String>,
    pub dispatch: Option<String>,
    pub situation_id: Option<i64>,
    pub tracking_type_id: Option<i64>,
}

impl TrackingEntry {
    /// The status a bill is in after this step.
    pub fn as_status(&self) -> BillStatus {
        BillStatus {
            at: self.at,
            organ: self.organ.clone(),
            dispatch: self.dispatch.clone(),
            situation_id: self.situation_id,
            tracking_type_id: self.tracking_type_id,
        }
    }
}

/// A bill row as returned by filtered listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillSummary {
    pub id: i64,
    pub title: Option<String>,
    pub label: Option<String>,
    pub start_year: Option<i32>,
    pub status_at: Option<NaiveDateTime>,
    pub situation: Option<String>,
}

/// A bill with its current status resolved against the reference tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillDetail {
    pub id: i64,
    pub title: Option<String>,
    pub label: Option<String>,
    pub start_year: Option<i32>,
    pub status_at: Option<NaiveDateTime>,
    pub organ: Option<String>,
    pub dispatch: Option<String>,
    pub situation_id: Option<i64>,
    pub situation: Option<String>,
    pub tracking_type_id: Option<i64>,
    pub tracking_type: Option<String>,
    pub themes: Vec<ReferenceItem>,
}

/// A stored tracking step joined with its descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRow {
    pub sequence: i64,
    pub at: NaiveDateTime,
    pub situation_id: Option<i64>,
    pub situation: Option<String>,
    pub tracking_type_id: Option<i64>,
    pub tracking_type: Option<String>,
}

/// A registered account. `password_hash` is a PHC-format Argon2 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<NaiveDateTime>,
}
