use async_trait::async_trait;
use tracing::{debug, warn};

use super::AutomationClient;

/// Liveness check gating every automation feature.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// `false` on transport error, timeout or non-2xx. Never errors, holds no state.
    async fn check_availability(&self) -> bool;
}

#[async_trait]
impl AvailabilityProbe for AutomationClient {
    async fn check_availability(&self) -> bool {
        let response = self
            .http
            .get(self.url("/"))
            .timeout(self.probe_timeout)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => {
                debug!("Automation backend at {} is available", self.base_url);
                true
            }
            Ok(r) => {
                warn!(
                    "Automation backend liveness probe returned {}",
                    r.status()
                );
                false
            }
            Err(e) => {
                warn!("Automation backend not available: {e}");
                false
            }
        }
    }
}
