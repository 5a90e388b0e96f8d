//! Application service — evaluate a liveness check against a machine.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use crate::application::ports::{ContainerEngine, HttpProbe};
use crate::domain::agent::{CheckOutcome, LivenessCheck, Probe};
use crate::domain::machine::InstanceHandle;

/// Status codes an HTTP ping accepts as live.
pub const HTTP_LIVE_STATUS: std::ops::Range<u16> = 200..400;

/// Everything a check needs besides the check itself.
pub struct Prober<'a, E, H> {
    pub engine: &'a E,
    pub http: &'a H,
    /// Upper bound of one HTTP ping.
    pub http_timeout: Duration,
}

impl<E: ContainerEngine, H: HttpProbe> Prober<'_, E, H> {
    /// Run every probe of `check` in order and combine the results.
    ///
    /// All probes run even after one fails. Engine or HTTP errors count as
    /// "not live".
    pub async fn evaluate(&self, handle: &InstanceHandle, check: &LivenessCheck) -> CheckOutcome {
        let mut results = Vec::with_capacity(check.probes.len());
        for probe in &check.probes {
            results.push(self.probe(handle, probe).await);
        }
        check.outcome(&results)
    }

    async fn probe(&self, handle: &InstanceHandle, probe: &Probe) -> bool {
        let result = match probe {
            Probe::ProcessRunning(name) => self.engine.is_process_running(handle, name).await,
            Probe::PortListening(port) => self.engine.is_port_listening(handle, port).await,
            Probe::HttpPing { port, path } => self.http_ping(handle, port, path).await,
        };
        result.unwrap_or_else(|e| {
            tracing::debug!(container = %handle.container_id, %probe, error = %e, "probe failed");
            false
        })
    }

    async fn http_ping(
        &self,
        handle: &InstanceHandle,
        port: &str,
        path: &str,
    ) -> anyhow::Result<bool> {
        let Some(address) = self.engine.host_address(handle, port).await? else {
            tracing::debug!(container = %handle.container_id, port, "port not published yet");
            return Ok(false);
        };
        let url = format!("http://{address}{path}");
        let status = tokio::time::timeout(self.http_timeout, self.http.ping(&url))
            .await
            .map_err(|_| anyhow::anyhow!("{url} did not answer within {:?}", self.http_timeout))??;
        Ok(HTTP_LIVE_STATUS.contains(&status))
    }
}
