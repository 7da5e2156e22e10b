//! HTTP adapters for the code-review and task-board services.

mod github;
mod trello;

pub use github::{GitHubClient, GitHubClientConfig};
pub use trello::{TrelloClient, TrelloClientConfig};

use crate::integration::ports::{ExternalApiError, ExternalApiResult};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// User agent sent with every outbound request.
const USER_AGENT: &str = "product-signoff";

fn map_transport_error(err: reqwest::Error) -> ExternalApiError {
    if err.is_timeout() {
        return ExternalApiError::Timeout;
    }
    ExternalApiError::transport(err)
}

/// Fails with [`ExternalApiError::UnexpectedStatus`] unless the response is
/// a 2xx.
async fn ensure_success(response: reqwest::Response) -> ExternalApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExternalApiError::UnexpectedStatus {
        status: status.as_u16(),
        body: truncate_for_error(&body, MAX_ERROR_BODY_CHARS),
    })
}

fn build_http_client(timeout: std::time::Duration) -> ExternalApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(ExternalApiError::transport)
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
