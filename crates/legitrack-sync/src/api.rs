//! The seam between the worker and the remote API.

use async_trait::async_trait;
use legitrack_core::{Envelope, ReferenceKind};

use crate::SyncError;

/// Read access to the Chamber open-data API.
///
/// Every call returns the raw response [`Envelope`]; the worker parses the
/// items one by one so a malformed entry only costs that entry.
#[async_trait]
pub trait CamaraApi: Send + Sync {
    /// `referencias/proposicoes/{codSituacao,codTipoTramitacao,codTema}`.
    async fn references(&self, kind: ReferenceKind) -> Result<Envelope, SyncError>;

    /// Absolute URL of the first listing page, ascending by id.
    fn first_page_url(&self, years: &[i32], per_page: u32) -> Result<String, SyncError>;

    /// One listing page. `url` is either [`first_page_url`](Self::first_page_url)
    /// or a `next` link taken from the previous page.
    async fn bill_page(&self, url: &str) -> Result<Envelope, SyncError>;

    /// `proposicoes/{id}`.
    async fn bill_detail(&self, id: i64) -> Result<Envelope, SyncError>;

    /// `proposicoes/{id}/tramitacoes`.
    async fn bill_tracking(&self, id: i64) -> Result<Envelope, SyncError>;

    /// `proposicoes/{id}/temas`.
    async fn bill_themes(&self, id: i64) -> Result<Envelope, SyncError>;
}
