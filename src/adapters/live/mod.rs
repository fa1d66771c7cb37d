//! Live adapters talking to real backends.

pub mod clock;
pub mod director;
pub mod github;

use std::time::Duration;

pub use clock::LiveClock;
pub use director::{DirectorAuth, LiveDirector};
pub use github::LiveGithub;

/// Per-request timeout of every live HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `User-Agent` sent on every request.
pub(crate) const USER_AGENT: &str = concat!("boshupdate/", env!("CARGO_PKG_VERSION"));

/// Builds the error of a non-2xx response, preferring the JSON `message`
/// (GitHub) or `error_description` (UAA) field over the raw body.
pub(crate) async fn status_error(response: reqwest::Response) -> crate::error::PortError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["message", "error_description", "description"]
                .iter()
                .find_map(|field| value.get(field).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
    format!("{status}: {message}").into()
}
