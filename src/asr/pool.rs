use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::BackendEntry;

use super::{AsrClient, BackendHealth};

/// A backend that answered its health probe.
#[derive(Debug, Clone)]
pub struct AdmittedBackend {
    pub entry: BackendEntry,
    pub health: BackendHealth,
    pub client: AsrClient,
}

/// Priority-ordered pool of heterogeneous ASR backends.
pub struct BackendPool {
    backends: Vec<BackendEntry>,
    request_timeout: Duration,
}

impl BackendPool {
    /// `backends` must already be sorted by ascending priority
    /// (see `Config::transcribe_backends`).
    pub fn new(backends: Vec<BackendEntry>, request_timeout: Duration) -> Self {
        Self {
            backends,
            request_timeout,
        }
    }

    /// Probe every backend and return the admitted ones ranked for use:
    /// ascending priority, ties broken in favor of GPU-backed servers.
    ///
    /// The first entry serves the whole request; the rest are failover
    /// candidates.
    pub async fn ranked(&self) -> Vec<AdmittedBackend> {
        let probes = self.backends.iter().map(|entry| {
            let client = AsrClient::new(&entry.url, self.request_timeout);
            async move {
                let health = client.health().await;
                (entry, client, health)
            }
        });

        let mut admitted = Vec::new();
        for (entry, client, health) in join_all(probes).await {
            match health {
                Ok(health) if health.is_ok() => {
                    debug!(
                        "Backend {} healthy (device={:?}, gpu={})",
                        entry.name, health.device, health.gpu_available
                    );
                    admitted.push(AdmittedBackend {
                        entry: entry.clone(),
                        health,
                        client,
                    });
                }
                Ok(health) => {
                    warn!("Backend {} reports status {:?}", entry.name, health.status);
                }
                Err(e) => {
                    debug!("Backend {} not available: {e}", entry.name);
                }
            }
        }

        admitted.sort_by_key(|b| (b.entry.priority, !b.health.gpu_available));

        if let Some(first) = admitted.first() {
            info!(
                "Selected transcription backend: {} ({})",
                first.entry.name,
                first.client.base_url()
            );
        } else {
            warn!("No available transcription backends");
        }
        admitted
    }
}
