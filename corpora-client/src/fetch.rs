//! Fetch executor: the single seam between the client and the network.
//!
//! Performs the HTTP call, decodes the JSON body, and maps every failure
//! mode onto [`FetchError`]. Never retries; retry policy belongs to the
//! query layer so attempt counts stay observable there. Session state is
//! ambient: the underlying client carries cookies set by the login flow.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use corpora_core::{FetchError, FetchResult};

use crate::config::PortalConfig;

/// HTTP executor bound to the portal's base URL.
#[derive(Clone)]
pub struct FetchExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl FetchExecutor {
    pub fn new(config: &PortalConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .cookie_store(true)
            .build()
            .map_err(|err| FetchError::Transport {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> FetchResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "DELETE");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(transport_error)?;
        parse_response(response).await
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        reason: err.to_string(),
    }
}

/// Decode a 2xx body as JSON; map non-2xx to [`FetchError::Remote`] with
/// the status and raw body for UI branching (e.g. 401 prompts login).
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> FetchResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(FetchError::Remote {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|err| FetchError::Decode {
        reason: err.to_string(),
    })
}
