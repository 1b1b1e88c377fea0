use legitrack_core::{BillDetail, BillSummary, ReferenceItem, TrackingRow, format_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Bills ──

#[derive(Debug, Serialize)]
pub struct BillListResponse {
    pub pagina: u32,
    pub itens: u32,
    pub total: usize,
    pub dados: Vec<BillSummaryView>,
}

#[derive(Debug, Serialize)]
pub struct BillSummaryView {
    pub id: i64,
    pub titulo: Option<String>,
    pub descricao: Option<String>,
    pub ano_inicio: Option<i32>,
    pub data_hora: Option<String>,
    pub situacao: Option<String>,
}

impl From<BillSummary> for BillSummaryView {
    fn from(b: BillSummary) -> Self {
        Self {
            id: b.id,
            titulo: b.title,
            descricao: b.label,
            ano_inicio: b.start_year,
            data_hora: b.status_at.as_ref().map(format_timestamp),
            situacao: b.situation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillDetailResponse {
    pub id: i64,
    pub informacoes: BillInfo,
    pub status_tramitacao_atual: CurrentStatus,
    pub temas: Vec<ThemeView>,
}

#[derive(Debug, Serialize)]
pub struct BillInfo {
    pub titulo: String,
    pub descricao: String,
    pub ano_inicio: Option<i32>,
}

/// Every field is a string; unknown values render as `""`.
#[derive(Debug, Serialize)]
pub struct CurrentStatus {
    pub descricao_tramitacao: String,
    pub descricao_situacao: String,
    pub sigla_orgao: String,
    pub data_hora: String,
    pub despacho: String,
}

#[derive(Debug, Serialize)]
pub struct ThemeView {
    pub cod: i64,
    pub nome: String,
}

impl From<ReferenceItem> for ThemeView {
    fn from(item: ReferenceItem) -> Self {
        Self {
            cod: item.id,
            nome: item.description,
        }
    }
}

impl From<BillDetail> for BillDetailResponse {
    fn from(b: BillDetail) -> Self {
        Self {
            id: b.id,
            informacoes: BillInfo {
                titulo: b.title.unwrap_or_default(),
                descricao: b.label.unwrap_or_default(),
                ano_inicio: b.start_year,
            },
            status_tramitacao_atual: CurrentStatus {
                descricao_tramitacao: b.tracking_type.unwrap_or_default(),
                descricao_situacao: b.situation.unwrap_or_default(),
                sigla_orgao: b.organ.unwrap_or_default(),
                data_hora: b.status_at.as_ref().map(format_timestamp).unwrap_or_default(),
                despacho: b.dispatch.unwrap_or_default(),
            },
            temas: b.themes.into_iter().map(ThemeView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackingView {
    pub sequencia: i64,
    pub data_hora: String,
    pub id_situacao: Option<i64>,
    pub descricao_situacao: Option<String>,
    pub id_tramitacao: Option<i64>,
    pub descricao_tramitacao: Option<String>,
}

impl From<TrackingRow> for TrackingView {
    fn from(t: TrackingRow) -> Self {
        Self {
            sequencia: t.sequence,
            data_hora: format_timestamp(&t.at),
            id_situacao: t.situation_id,
            descricao_situacao: t.situation,
            id_tramitacao: t.tracking_type_id,
            descricao_tramitacao: t.tracking_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ThemeListResponse {
    pub total_de_temas: usize,
    pub temas: Vec<String>,
}

// ── Accounts ──

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

// ── Interests ──

/// `codigos` holds theme codes as numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct InterestsRequest {
    #[serde(default)]
    pub codigos: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct InterestsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensagem: Option<String>,
    pub temas_selecionados: Vec<i64>,
}
