//! Infrastructure implementation of the `HttpProbe` port using `reqwest`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::application::ports::HttpProbe;

/// Single-shot GET with redirects disabled, so a 3xx counts as an answer.
pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl HttpProbe for ReqwestProbe {
    async fn ping(&self, url: &str) -> Result<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        Ok(response.status().as_u16())
    }
}
