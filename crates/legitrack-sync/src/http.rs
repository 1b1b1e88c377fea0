//! HTTP client for the Chamber open-data API.

use std::time::Duration;

use async_trait::async_trait;
use legitrack_core::{Envelope, ReferenceKind};
use reqwest::Url;
use tracing::{debug, info};

use crate::{CamaraApi, SyncError};

pub const DEFAULT_BASE_URL: &str = "https://dadosabertos.camara.leg.br/api/v2";

const ITEM_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for `dadosabertos.camara.leg.br/api/v2` or a compatible mirror.
pub struct CamaraClient {
    client: reqwest::Client,
    base_url: String,
}

impl CamaraClient {
    /// Create a client for the given base URL, e.g. [`DEFAULT_BASE_URL`].
    /// A trailing slash is ignored.
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("legitrack/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, SyncError> {
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    async fn get(&self, url: Url, timeout: Duration) -> Result<Envelope, SyncError> {
        debug!(url = %url, "GET");
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CamaraApi for CamaraClient {
    async fn references(&self, kind: ReferenceKind) -> Result<Envelope, SyncError> {
        let url = self.url(kind.endpoint())?;
        info!(url = %url, table = %kind, "fetching reference table");
        self.get(url, ITEM_TIMEOUT).await
    }

    fn first_page_url(&self, years: &[i32], per_page: u32) -> Result<String, SyncError> {
        let mut url = self.url("proposicoes")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("pagina", "1")
                .append_pair("itens", &per_page.to_string())
                .append_pair("ordem", "ASC")
                .append_pair("ordenarPor", "id");
            for year in years {
                query.append_pair("ano", &year.to_string());
            }
        }
        Ok(url.into())
    }

    async fn bill_page(&self, url: &str) -> Result<Envelope, SyncError> {
        let url = Url::parse(url)?;
        info!(url = %url, "fetching bill page");
        self.get(url, PAGE_TIMEOUT).await
    }

    async fn bill_detail(&self, id: i64) -> Result<Envelope, SyncError> {
        self.get(self.url(&format!("proposicoes/{id}"))?, ITEM_TIMEOUT)
            .await
    }

    async fn bill_tracking(&self, id: i64) -> Result<Envelope, SyncError> {
        self.get(
            self.url(&format!("proposicoes/{id}/tramitacoes"))?,
            ITEM_TIMEOUT,
        )
        .await
    }

    async fn bill_themes(&self, id: i64) -> Result<Envelope, SyncError> {
        self.get(self.url(&format!("proposicoes/{id}/temas"))?, ITEM_TIMEOUT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let client = CamaraClient::new("https://example.org/api/v2/").unwrap();
        assert_eq!(
            client.url("proposicoes/1").unwrap().as_str(),
            "https://example.org/api/v2/proposicoes/1"
        );
    }

    #[test]
    fn first_page_without_years() {
        let client = CamaraClient::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            client.first_page_url(&[], 100).unwrap(),
            "https://dadosabertos.camara.leg.br/api/v2/proposicoes?pagina=1&itens=100&ordem=ASC&ordenarPor=id"
        );
    }

    #[test]
    fn first_page_repeats_year_parameter() {
        let client = CamaraClient::new(DEFAULT_BASE_URL).unwrap();
        let url = client.first_page_url(&[2023, 2022], 50).unwrap();
        assert!(url.contains("itens=50"));
        assert!(url.ends_with("&ano=2023&ano=2022"));
    }

    #[test]
    fn reference_endpoints_resolve() {
        let client = CamaraClient::new("http://localhost:9000").unwrap();
        assert_eq!(
            client
                .url(ReferenceKind::Theme.endpoint())
                .unwrap()
                .as_str(),
            "http://localhost:9000/referencias/proposicoes/codTema"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected_on_use() {
        let client = CamaraClient::new("not a url").unwrap();
        assert!(matches!(client.url("x"), Err(SyncError::Url(_))));
    }

    // ── Against a local server ──

    #[tokio::test]
    async fn fetches_reference_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/referencias/proposicoes/codTema"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dados": [{"cod": "40", "nome": "Educação"}],
                "links": []
            })))
            .mount(&server)
            .await;

        let client = CamaraClient::new(&format!("{}/", server.uri())).unwrap();
        let envelope = client.references(ReferenceKind::Theme).await.unwrap();
        assert_eq!(envelope.items().len(), 1);
        assert_eq!(envelope.items()[0]["nome"], "Educação");
        assert!(envelope.next_href().is_none());
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proposicoes/7"))
            .respond_with(ResponseTemplate::new(503).set_body_string("em manutenção"))
            .mount(&server)
            .await;

        let client = CamaraClient::new(&server.uri()).unwrap();
        match client.bill_detail(7).await {
            Err(SyncError::Server { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "em manutenção");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_body_is_a_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proposicoes/7/temas"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = CamaraClient::new(&server.uri()).unwrap();
        assert!(matches!(
            client.bill_themes(7).await,
            Err(SyncError::Json(_))
        ));
    }

    #[tokio::test]
    async fn listing_sends_every_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proposicoes"))
            .and(query_param("ano", "2023"))
            .and(query_param("ano", "2022"))
            .and(query_param("ordenarPor", "id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dados": [{"id": 1}, {"id": 2}],
                "links": [{"rel": "next", "href": format!("{}/proposicoes?pagina=2", server.uri())}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CamaraClient::new(&server.uri()).unwrap();
        let url = client.first_page_url(&[2023, 2022], 100).unwrap();
        let page = client.bill_page(&url).await.unwrap();
        assert_eq!(page.items().len(), 2);
        assert_eq!(
            page.next_href(),
            Some(format!("{}/proposicoes?pagina=2", server.uri()).as_str())
        );

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        let years: Vec<String> = received[0]
            .url
            .query_pairs()
            .filter(|(k, _)| k == "ano")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(years, vec!["2023", "2022"]);
    }
}
