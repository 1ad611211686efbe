//! Best-effort backend probe.
//!
//! On load, the backend can be asked what it makes of the media URL. The
//! answer is only logged and published; the load never waits for it.

use std::sync::Arc;
use std::time::Duration;

use castforged_common::{Error, EventBus, EventPayload, Result, SessionId};
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;

/// Path of the probe endpoint relative to the backend origin.
pub const PROBE_PATH: &str = "/hlsv2/probe";

/// `{origin}/hlsv2/probe?mediaURL=<encoded media url>`
pub fn probe_url(origin: &str, media_url: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}{}", origin.trim_end_matches('/'), PROBE_PATH))
        .map_err(|e| Error::invalid_input(format!("bad origin {origin}: {e}")))?;
    url.query_pairs_mut().append_pair("mediaURL", media_url);
    Ok(url)
}

pub struct DiagnosticProbe {
    client: Client,
    events: Arc<EventBus>,
    session_id: SessionId,
}

impl DiagnosticProbe {
    pub fn new(timeout: Duration, events: Arc<EventBus>, session_id: SessionId) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            events,
            session_id,
        }
    }

    /// Fire the probe in the background. Returns `None` when there is no
    /// runtime to run it on or the URL cannot be built.
    pub fn spawn(&self, origin: &str, media_url: &str) -> Option<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current().ok().or_else(|| {
            tracing::debug!("No async runtime, skipping diagnostic probe");
            None
        })?;

        let url = match probe_url(origin, media_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping diagnostic probe: {}", e);
                return None;
            }
        };

        let client = self.client.clone();
        let events = self.events.clone();
        let session_id = self.session_id;
        let media_url = media_url.to_string();

        Some(runtime.spawn(async move {
            let payload = match fetch_json(&client, url).await {
                Ok(body) => {
                    tracing::info!(%media_url, %body, "Diagnostic probe");
                    EventPayload::DiagnosticProbeCompleted { media_url, body }
                }
                Err(e) => {
                    tracing::warn!(%media_url, "Diagnostic probe failed: {}", e);
                    EventPayload::DiagnosticProbeFailed {
                        media_url,
                        error: e.to_string(),
                    }
                }
            };
            events.publish(session_id, payload);
        }))
    }
}

async fn fetch_json(client: &Client, url: Url) -> Result<serde_json::Value> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::http(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::http(format!("GET {url}: status {}", response.status())));
    }

    response
        .json()
        .await
        .map_err(|e| Error::http(format!("GET {url}: invalid body: {e}")))
}
