use std::time::Duration;

use guildkeeper_core::config::FeedsConfig;
use guildkeeper_core::feeds::FetchError;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to build http client: {0}")]
pub struct HttpClientError(#[from] reqwest::Error);

/// Shared client for every outbound fetch; carries the configured timeout and user agent.
pub fn build_client(config: &FeedsConfig) -> Result<Client, HttpClientError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?)
}

pub(crate) fn transport_error(target: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::Timeout { target: target.to_owned() };
    }
    FetchError::Transport { target: target.to_owned(), message: error.to_string() }
}

pub(crate) async fn get_text(client: &Client, url: &str, target: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await.map_err(|error| transport_error(target, error))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { target: target.to_owned(), status: status.as_u16() });
    }

    response.text().await.map_err(|error| transport_error(target, error))
}
