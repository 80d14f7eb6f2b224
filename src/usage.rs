//! Usage tracking and quota counter client.
//!
//! All calls here are best-effort: they run on detached tasks, failures are
//! logged and dropped, and nothing in the render or export path waits on
//! them. The quota counter is display-only.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{config::AnalyticsCfg, payload::PayloadType};

/// Daily usage as reported by the quota service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub used: u64,
    pub limit: u64,
}

/// One successful export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionEvent {
    pub payload_type: PayloadType,
    pub duration_ms: u64,
    pub file_size: u64,
}

/// Fire-and-forget sink for usage events. Implementations must not block.
pub trait UsageSink: Send + Sync {
    fn pageview(&self, path: &str, referrer: &str);
    fn conversion(&self, event: ConversionEvent);
    fn refresh_quota(&self);
}

/// Sink used when analytics are disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl UsageSink for NoopSink {
    fn pageview(&self, _path: &str, _referrer: &str) {}
    fn conversion(&self, _event: ConversionEvent) {}
    fn refresh_quota(&self) {}
}

#[derive(Debug, Serialize)]
struct PageviewReq<'a> {
    project: &'a str,
    path: &'a str,
    referrer: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversionReq<'a> {
    project: &'a str,
    url: &'a str,
    success: bool,
    duration: u64,
    file_size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotaReq<'a> {
    project: &'a str,
    daily_limit: u32,
    monthly_limit: u32,
}

#[derive(Debug, Deserialize)]
struct QuotaResp {
    daily: Option<QuotaSnapshot>,
}

/// HTTP client for the analytics/quota service. Quota snapshots are pushed
/// to the UI through `quota_tx`.
#[derive(Clone)]
pub struct HttpUsageClient {
    http: Client,
    base_url: String,
    project: String,
    daily_limit: u32,
    monthly_limit: u32,
    quota_tx: mpsc::Sender<QuotaSnapshot>,
}

impl HttpUsageClient {
    pub fn new(cfg: &AnalyticsCfg, quota_tx: mpsc::Sender<QuotaSnapshot>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            project: cfg.project.clone(),
            daily_limit: cfg.daily_limit,
            monthly_limit: cfg.monthly_limit,
            quota_tx,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp)
    }

    async fn send_pageview(&self, path: &str, referrer: &str) -> Result<()> {
        let body = PageviewReq {
            project: &self.project,
            path,
            referrer,
        };
        self.post("/api/track/pageview", &body).await?;
        Ok(())
    }

    async fn send_conversion(&self, event: ConversionEvent) -> Result<()> {
        let body = ConversionReq {
            project: &self.project,
            url: event.payload_type.as_str(),
            success: true,
            duration: event.duration_ms,
            file_size: event.file_size,
        };
        self.post("/api/track/conversion", &body).await?;
        Ok(())
    }

    /// Ask the service for the current counter.
    pub async fn fetch_quota(&self) -> Result<Option<QuotaSnapshot>> {
        let body = QuotaReq {
            project: &self.project,
            daily_limit: self.daily_limit,
            monthly_limit: self.monthly_limit,
        };
        let resp = self
            .post("/api/quota/check", &body)
            .await?
            .json::<QuotaResp>()
            .await?;
        Ok(resp.daily)
    }

    async fn publish_quota(&self) {
        match self.fetch_quota().await {
            Ok(Some(snapshot)) => {
                tracing::info!("quota: {}/{}", snapshot.used, snapshot.limit);
                let _ = self.quota_tx.send(snapshot).await;
            }
            Ok(None) => tracing::warn!("quota response without daily counter"),
            Err(e) => tracing::warn!("quota fetch failed: {e}"),
        }
    }
}

impl UsageSink for HttpUsageClient {
    fn pageview(&self, path: &str, referrer: &str) {
        let client = self.clone();
        let (path, referrer) = (path.to_string(), referrer.to_string());
        tokio::spawn(async move {
            if let Err(e) = client.send_pageview(&path, &referrer).await {
                tracing::warn!("pageview tracking failed: {e}");
            }
        });
    }

    fn conversion(&self, event: ConversionEvent) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send_conversion(event).await {
                tracing::warn!("conversion tracking failed: {e}");
            }
            client.publish_quota().await;
        });
    }

    fn refresh_quota(&self) {
        let client = self.clone();
        tokio::spawn(async move {
            client.publish_quota().await;
        });
    }
}

/// Sink that records calls, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub pageviews: std::sync::Mutex<Vec<(String, String)>>,
    pub conversions: std::sync::Mutex<Vec<ConversionEvent>>,
    pub quota_refreshes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl UsageSink for RecordingSink {
    fn pageview(&self, path: &str, referrer: &str) {
        self.pageviews
            .lock()
            .unwrap()
            .push((path.to_string(), referrer.to_string()));
    }

    fn conversion(&self, event: ConversionEvent) {
        self.conversions.lock().unwrap().push(event);
    }

    fn refresh_quota(&self) {
        self.quota_refreshes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn cfg(base_url: String) -> AnalyticsCfg {
        AnalyticsCfg {
            base_url,
            ..AnalyticsCfg::default()
        }
    }

    /// Read one HTTP request from `sock`, answer with `body` as JSON and
    /// return the raw request.
    async fn answer(sock: &mut TcpStream, body: &str) -> String {
        let mut buf = vec![0u8; 8192];
        let mut req = Vec::new();
        loop {
            let n = sock.read(&mut buf).await.unwrap();
            req.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&req);
            if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                let len = head
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if rest.len() >= len {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let resp = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&req).into_owned()
    }

    /// Accept one connection per canned body, in order, and hand back the
    /// raw requests.
    async fn scripted_server(
        bodies: Vec<&'static str>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in bodies {
                let (mut sock, _) = listener.accept().await.unwrap();
                requests.push(answer(&mut sock, body).await);
            }
            requests
        });
        (format!("http://{addr}"), handle)
    }

    /// Serve one canned JSON response and hand back the raw request.
    async fn one_shot_server(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let (base, server) = scripted_server(vec![body]).await;
        let handle = tokio::spawn(async move { server.await.unwrap().remove(0) });
        (base, handle)
    }

    #[test]
    fn request_bodies_use_service_field_names() {
        let conversion = ConversionReq {
            project: "qr-code",
            url: PayloadType::Wifi.as_str(),
            success: true,
            duration: 12,
            file_size: 3456,
        };
        assert_eq!(
            serde_json::to_value(&conversion).unwrap(),
            json!({"project": "qr-code", "url": "wifi", "success": true, "duration": 12, "fileSize": 3456})
        );

        let quota = QuotaReq {
            project: "qr-code",
            daily_limit: 100,
            monthly_limit: 1000,
        };
        assert_eq!(
            serde_json::to_value(&quota).unwrap(),
            json!({"project": "qr-code", "dailyLimit": 100, "monthlyLimit": 1000})
        );

        let pageview = PageviewReq {
            project: "qr-code",
            path: "/",
            referrer: "",
        };
        assert_eq!(
            serde_json::to_value(&pageview).unwrap(),
            json!({"project": "qr-code", "path": "/", "referrer": ""})
        );
    }

    #[test]
    fn quota_response_tolerates_missing_counter() {
        let resp: QuotaResp =
            serde_json::from_str(r#"{"daily":{"used":3,"limit":100},"monthly":{"used":9}}"#)
                .unwrap();
        assert_eq!(resp.daily, Some(QuotaSnapshot { used: 3, limit: 100 }));
        let resp: QuotaResp = serde_json::from_str(r#"{"error":"blocked"}"#).unwrap();
        assert_eq!(resp.daily, None);
    }

    #[tokio::test]
    async fn fetch_quota_posts_limits_and_parses_snapshot() {
        let (base, server) = one_shot_server(r#"{"daily":{"used":42,"limit":100}}"#).await;
        let (tx, _rx) = mpsc::channel(1);
        let client = HttpUsageClient::new(&cfg(base), tx).unwrap();

        let snapshot = client.fetch_quota().await.unwrap();
        assert_eq!(snapshot, Some(QuotaSnapshot { used: 42, limit: 100 }));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/quota/check "));
        assert!(request.contains(r#""dailyLimit":100"#));
        assert!(request.contains(r#""monthlyLimit":1000"#));
    }

    #[tokio::test]
    async fn refresh_quota_pushes_snapshot_to_channel() {
        let (base, _server) = one_shot_server(r#"{"daily":{"used":1,"limit":100}}"#).await;
        let (tx, mut rx) = mpsc::channel(1);
        let client = HttpUsageClient::new(&cfg(base), tx).unwrap();

        client.refresh_quota();
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(QuotaSnapshot { used: 1, limit: 100 }));
    }

    #[tokio::test]
    async fn conversion_is_followed_by_quota_refresh() {
        let (base, server) =
            scripted_server(vec![r#"{}"#, r#"{"daily":{"used":7,"limit":100}}"#]).await;
        let (tx, mut rx) = mpsc::channel(1);
        let client = HttpUsageClient::new(&cfg(base), tx).unwrap();

        client.conversion(ConversionEvent {
            payload_type: PayloadType::Sms,
            duration_ms: 3,
            file_size: 512,
        });
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(QuotaSnapshot { used: 7, limit: 100 }));

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /api/track/conversion "));
        assert!(requests[0].contains(r#""url":"sms""#));
        assert!(requests[0].contains(r#""fileSize":512"#));
        assert!(requests[1].starts_with("POST /api/quota/check "));
    }

    #[tokio::test]
    async fn unreachable_service_is_absorbed() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let client = HttpUsageClient::new(&cfg(format!("http://{addr}")), tx).unwrap();

        assert!(client.fetch_quota().await.is_err());
        client.pageview("/", "");
        client.conversion(ConversionEvent {
            payload_type: PayloadType::Url,
            duration_ms: 0,
            file_size: 0,
        });
        let got = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(got.is_err(), "no snapshot expected");
    }
}
