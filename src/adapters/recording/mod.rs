//! Recording adapters: delegate to an inner port and append every call to a
//! cassette.

pub mod clock;
pub mod director;
pub mod github;

use serde::Serialize;

use crate::cassette::session::SharedRecorder;

pub use clock::RecordingClock;
pub use director::RecordingDirector;
pub use github::RecordingSourceControl;

/// Records an infallible call.
pub(crate) fn record_interaction<I, O>(recorder: &SharedRecorder, port: &str, method: &str, input: &I, output: &O)
where
    I: Serialize,
    O: Serialize,
{
    let input = serde_json::to_value(input).expect("recording input serializes");
    let output = serde_json::to_value(output).expect("recording output serializes");
    recorder.lock().expect("recorder lock poisoned").record(port, method, input, output);
}

/// Records a fallible call as `{"Ok": value}` or `{"Err": message}`.
pub(crate) fn record_result<T, E, I>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let input = serde_json::to_value(input).expect("recording input serializes");
    let output = match result {
        Ok(v) => serde_json::json!({ "Ok": serde_json::to_value(v).expect("recording output serializes") }),
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };
    recorder.lock().expect("recorder lock poisoned").record(port, method, input, output);
}
