//! Classifier connectivity, polled on a fixed timer outside the audit core.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

pub trait HealthCheck: Send + Sync + 'static {
    fn check_health(&self) -> impl Future<Output = bool> + Send;
}

/// Polls `<base_url>/health`; any 2xx counts as online.
pub struct HttpHealthCheck {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthCheck {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/health", base_url.trim_end_matches('/')),
        })
    }
}

impl HealthCheck for HttpHealthCheck {
    async fn check_health(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(res) => res.status().is_success(),
            Err(err) => {
                debug!(url = %self.url, error = %err, "classifier health check failed");
                false
            }
        }
    }
}

/// Poll `checker` every `every` and publish the latest status. The task ends
/// once every receiver is gone.
pub fn spawn_monitor<H: HealthCheck>(checker: H, every: Duration) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let online = checker.check_health().await;
            debug!(online, "classifier health polled");
            let changed = tx.send_if_modified(|current| {
                let changed = *current != online;
                *current = online;
                changed
            });
            if changed {
                info!(online, "classifier connectivity changed");
            }
            if tx.is_closed() {
                break;
            }
        }
    });
    rx
}
