//! Payloads of the Chamber open-data API (`dadosabertos.camara.leg.br/api/v2`).
//!
//! Every response is wrapped in an [`Envelope`]. The `dados` member is kept
//! as raw JSON so that each item can be parsed on its own with
//! [`parse_item`]: one malformed entry must never fail the whole response.
//!
//! Numeric codes arrive either as JSON numbers or as numeric strings
//! (`"cod": "1140"`); both forms are accepted.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::label::{bill_label, parse_api_timestamp};
use crate::model::{BillRecord, BillStatus, ReferenceItem, TrackingEntry};

/// Why a single item of a response was rejected.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("item is not a JSON object")]
    NotAnObject,
    #[error("malformed item: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing or empty field `{0}`")]
    Missing(&'static str),
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
}

/// Top-level response wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub dados: Value,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

impl Envelope {
    /// Items of a list response. Anything other than an array yields nothing.
    pub fn items(&self) -> &[Value] {
        self.dados.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    /// Consume the envelope, keeping only the list items.
    pub fn into_items(self) -> Vec<Value> {
        match self.dados {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    /// Target of the `next` pagination link, if any.
    pub fn next_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.href.as_str())
            .filter(|h| !h.is_empty())
    }
}

/// Parse one item of `dados`. Non-objects are rejected before serde sees them.
pub fn parse_item<T: DeserializeOwned>(value: &Value) -> Result<T, ItemError> {
    if !value.is_object() {
        return Err(ItemError::NotAnObject);
    }
    Ok(T::deserialize(value)?)
}

// ── Reference tables ──

/// Entry of `referencias/proposicoes/*`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteReference {
    #[serde(deserialize_with = "lenient_i64")]
    pub cod: i64,
    #[serde(default)]
    pub nome: Option<String>,
}

impl TryFrom<RemoteReference> for ReferenceItem {
    type Error = ItemError;

    fn try_from(r: RemoteReference) -> Result<Self, Self::Error> {
        let description = r
            .nome
            .filter(|n| !n.trim().is_empty())
            .ok_or(ItemError::Missing("nome"))?;
        Ok(ReferenceItem {
            id: r.cod,
            description,
        })
    }
}

// ── Bills ──

/// Entry of the paginated `proposicoes` listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBillSummary {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub sigla_tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub numero: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub ano: Option<i64>,
    #[serde(default)]
    pub ementa: Option<String>,
}

impl From<&RemoteBillSummary> for BillRecord {
    fn from(s: &RemoteBillSummary) -> Self {
        BillRecord {
            id: s.id,
            title: s.ementa.clone(),
            label: bill_label(s.sigla_tipo.as_deref(), s.numero, s.ano),
            start_year: s.ano.and_then(|y| i32::try_from(y).ok()),
        }
    }
}

/// `dados` of `proposicoes/{id}`. Only the status block is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBillDetail {
    #[serde(default)]
    pub status_proposicao: Option<Value>,
}

/// A status as found in `statusProposicao` and in `proposicoes/{id}/tramitacoes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub sequencia: Option<i64>,
    #[serde(default)]
    pub data_hora: Option<String>,
    #[serde(default)]
    pub sigla_orgao: Option<String>,
    #[serde(default)]
    pub despacho: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub cod_situacao: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub cod_tipo_tramitacao: Option<i64>,
}

impl RemoteStatus {
    fn timestamp(&self) -> Result<chrono::NaiveDateTime, ItemError> {
        let raw = self
            .data_hora
            .as_deref()
            .ok_or(ItemError::Missing("dataHora"))?;
        parse_api_timestamp(raw).ok_or_else(|| ItemError::Timestamp(raw.to_string()))
    }
}

impl TryFrom<RemoteStatus> for BillStatus {
    type Error = ItemError;

    fn try_from(s: RemoteStatus) -> Result<Self, Self::Error> {
        Ok(BillStatus {
            at: s.timestamp()?,
            organ: s.sigla_orgao,
            dispatch: s.despacho,
            situation_id: s.cod_situacao,
            tracking_type_id: s.cod_tipo_tramitacao,
        })
    }
}

impl TryFrom<RemoteStatus> for TrackingEntry {
    type Error = ItemError;

    fn try_from(s: RemoteStatus) -> Result<Self, Self::Error> {
        let at = s.timestamp()?;
        let sequence = s.sequencia.ok_or(ItemError::Missing("sequencia"))?;
        Ok(TrackingEntry {
            sequence,
            at,
            organ: s.sigla_orgao,
            dispatch: s.despacho,
            situation_id: s.cod_situacao,
            tracking_type_id: s.cod_tipo_tramitacao,
        })
    }
}

/// Entry of `proposicoes/{id}/temas`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBillTheme {
    #[serde(rename = "codTema", alias = "cod", deserialize_with = "lenient_i64")]
    pub cod_tema: i64,
}

// ── Lenient integers ──

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

fn to_i64<E: serde::de::Error>(raw: NumberOrString) -> Result<Option<i64>, E> {
    match raw {
        NumberOrString::Int(n) => Ok(Some(n)),
        NumberOrString::Float(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
        NumberOrString::Float(f) => Err(E::custom(format!("not an integer: {f}"))),
        NumberOrString::Str(s) if s.trim().is_empty() => Ok(None),
        NumberOrString::Str(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| E::custom(format!("not an integer: {s:?}"))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    to_i64(NumberOrString::deserialize(d)?)?.ok_or_else(|| D::Error::custom("empty integer"))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<NumberOrString>::deserialize(d)? {
        Some(raw) => to_i64(raw),
        None => Ok(None),
    }
}
