use crate::directory::Directory;
use crate::models::{FacetCount, FacetKind, RadioBrowserServer, Station};
use crate::query::SearchQuery;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

const BOOTSTRAP_HOST: &str = "all.api.radio-browser.info";
const MAX_BODY_BYTES: usize = 1_000_000;

/// Radio Browser JSON API client. The mirror host is chosen once per
/// session and reused for every request.
#[derive(Debug)]
pub struct RadioBrowserClient {
    http: reqwest::Client,
    pinned_server: Option<String>,
    last_server: Option<String>,
    base: Mutex<Option<String>>,
}

impl RadioBrowserClient {
    pub fn new(pinned_server: Option<String>, last_server: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("StationFinder/0.1 (station discovery)"),
        );
        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            pinned_server,
            last_server,
            base: Mutex::new(None),
        })
    }

    /// Host serving this session, once one has been chosen.
    pub async fn current_server(&self) -> Option<String> {
        self.base
            .lock()
            .await
            .as_deref()
            .map(|b| b.trim_start_matches("https://").trim_start_matches("http://").to_string())
    }

    pub async fn discover_servers(&self) -> Result<Vec<String>> {
        let url = format!("https://{BOOTSTRAP_HOST}/json/servers");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Server discovery failed")?
            .error_for_status()
            .context("Server discovery failed")?;
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        let servers: Vec<RadioBrowserServer> =
            serde_json::from_slice(&bytes).context("Invalid /json/servers response")?;
        let mut names: Vec<String> = servers.into_iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(anyhow!("Radio Browser server list was empty"));
        }
        Ok(names)
    }

    async fn base_url(&self) -> String {
        let mut base = self.base.lock().await;
        if let Some(b) = base.as_ref() {
            return b.clone();
        }

        let chosen = match self.pinned_server.as_deref() {
            Some(pinned) => base_from_host(pinned),
            None => match self.discover_servers().await {
                Ok(servers) => {
                    base_from_host(&pick_server(servers, self.last_server.as_deref()))
                }
                Err(e) => {
                    warn!(error = ?e, "server discovery failed, using bootstrap host");
                    base_from_host(BOOTSTRAP_HOST)
                }
            },
        };
        debug!(base = %chosen, "radio browser mirror selected");
        *base = Some(chosen.clone());
        chosen
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{what} returned HTTP {status}"));
        }
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("Invalid {what} response"))
    }
}

#[async_trait]
impl Directory for RadioBrowserClient {
    async fn fetch_facet(&self, kind: FacetKind) -> Result<Vec<FacetCount>> {
        let base = self.base_url().await;
        let url = Url::parse(&format!("{base}/json/{}", kind.endpoint()))
            .context("Invalid Radio Browser base URL")?;
        self.get_json(url, kind.endpoint()).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Station>> {
        let base = self.base_url().await;
        let url = search_url(&base, query)?;
        let stations: Vec<Station> = self.get_json(url, "station search").await?;
        debug!(count = stations.len(), "station search returned");
        Ok(stations)
    }
}

fn pick_server(mut servers: Vec<String>, preferred: Option<&str>) -> String {
    servers.shuffle(&mut rand::thread_rng());
    if let Some(last) = preferred {
        if let Some(pos) = servers.iter().position(|s| s == last) {
            servers.swap(0, pos);
        }
    }
    servers
        .into_iter()
        .next()
        .unwrap_or_else(|| BOOTSTRAP_HOST.to_string())
}

fn base_from_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn search_url(base: &str, query: &SearchQuery) -> Result<Url> {
    let mut url = Url::parse(&format!("{base}/json/stations/search"))
        .context("Invalid Radio Browser base URL")?;
    url.query_pairs_mut().extend_pairs(query.to_pairs());
    Ok(url)
}

async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(anyhow!("HTTP response too large ({len} bytes)"));
        }
    }

    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("HTTP body read error")?;
        if data.len().saturating_add(chunk.len()) > limit {
            return Err(anyhow!("HTTP response exceeded size limit"));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterSelection, SortKey};
    use crate::query::build_query;

    #[test]
    fn parses_servers() {
        let body = r#"[{"name":"de1.api.radio-browser.info"},{"name":"fr1.api.radio-browser.info"}]"#;
        let servers: Vec<RadioBrowserServer> = serde_json::from_str(body).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "de1.api.radio-browser.info");
    }

    #[test]
    fn parses_search_results() {
        let body = r#"[{"stationuuid":"u1","name":"Test FM","url_resolved":"https://s/1","country":"France","language":"french","tags":"jazz,news","codec":"MP3","bitrate":128,"votes":42,"clickcount":7,"favicon":""}]"#;
        let stations: Vec<Station> = serde_json::from_str(body).unwrap();
        assert_eq!(stations[0].stationuuid, "u1");
        assert_eq!(stations[0].bitrate, 128);
        assert_eq!(stations[0].clickcount, 7);
        assert_eq!(stations[0].favicon.as_deref(), Some(""));
    }

    #[test]
    fn builds_search_url() {
        let mut sel = FilterSelection::with_country(Some("Côte d'Ivoire".into()));
        sel.tag = Some("jazz".into());
        sel.sort = SortKey::Name;
        let url = search_url("https://de1.api.radio-browser.info", &build_query(&sel)).unwrap();
        assert_eq!(url.path(), "/json/stations/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("country".to_string(), "Côte d'Ivoire".to_string()),
                ("tag".to_string(), "jazz".to_string()),
                ("order".to_string(), "name".to_string()),
                ("reverse".to_string(), "true".to_string()),
                ("limit".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn normalizes_hosts() {
        assert_eq!(base_from_host("de1.api.radio-browser.info"), "https://de1.api.radio-browser.info");
        assert_eq!(base_from_host("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
    }

    #[test]
    fn prefers_last_server() {
        let servers = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(pick_server(servers.clone(), Some("b")), "b");
        assert!(servers.contains(&pick_server(servers.clone(), Some("zz"))));
        assert_eq!(pick_server(vec![], None), BOOTSTRAP_HOST);
    }

    /// Serves one canned HTTP response on a loopback port and returns its base URL.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn error_status_fails_the_search() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 2\r\nConnection: close\r\n\r\n[]",
        )
        .await;
        let client = RadioBrowserClient::new(Some(base), None).unwrap();
        let err = client
            .search(&build_query(&FilterSelection::default()))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("HTTP 500"), "{err:#}");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2000000\r\nConnection: close\r\n\r\n[",
        )
        .await;
        let client = RadioBrowserClient::new(Some(base), None).unwrap();
        let err = client.fetch_facet(FacetKind::Tag).await.unwrap_err();
        assert!(format!("{err:#}").contains("too large"), "{err:#}");
    }

    #[tokio::test]
    async fn facet_records_come_back_from_pinned_server() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 36\r\nConnection: close\r\n\r\n[{\"name\":\"France\",\"stationcount\":9}]",
        )
        .await;
        let client = RadioBrowserClient::new(Some(base), None).unwrap();
        let counts = client.fetch_facet(FacetKind::Country).await.unwrap();
        assert_eq!(
            counts,
            vec![FacetCount {
                name: "France".into(),
                population: 9,
            }]
        );
    }

    #[tokio::test]
    async fn pinned_server_skips_discovery() {
        let client = RadioBrowserClient::new(Some("mirror.example".into()), None).unwrap();
        assert_eq!(client.current_server().await, None);
        assert_eq!(client.base_url().await, "https://mirror.example");
        assert_eq!(client.current_server().await.as_deref(), Some("mirror.example"));
    }
}
