//! Replaying adapters: serve recorded cassette outputs instead of calling
//! real backends.

pub mod clock;
pub mod director;
pub mod github;

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::PortError;

pub use clock::ReplayingClock;
pub use director::ReplayingDirector;
pub use github::ReplayingSourceControl;

/// Takes the output of the next recorded `port::method` call.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> Result<serde_json::Value, PortError> {
    let mut guard = replayer.lock().expect("replayer lock poisoned");
    Ok(guard.next_interaction(port, method)?.output)
}

/// Decodes a recorded `{"Ok": value}` / `{"Err": message}` output.
pub(crate) fn replay_result<T: DeserializeOwned>(output: serde_json::Value) -> Result<T, PortError> {
    if let Some(err) = output.get("Err") {
        let message = err.as_str().map_or_else(|| err.to_string(), str::to_string);
        return Err(message.into());
    }
    let value = output.get("Ok").cloned().ok_or_else(|| format!("malformed recorded output: {output}"))?;
    Ok(serde_json::from_value(value)?)
}
