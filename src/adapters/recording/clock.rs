//! Recording adapter for the clock port.

use chrono::{DateTime, Utc};

use super::record_interaction;
use crate::cassette::ports;
use crate::cassette::session::SharedRecorder;
use crate::ports::Clock;

/// Records every `now` reading of the wrapped clock.
pub struct RecordingClock {
    inner: Box<dyn Clock>,
    recorder: SharedRecorder,
}

impl RecordingClock {
    /// Wraps `inner`, appending to `recorder`.
    pub fn new(inner: Box<dyn Clock>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.inner.now();
        record_interaction(&self.recorder, ports::CLOCK, "now", &(), &now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::ManualClock;
    use crate::cassette::format::Cassette;
    use crate::cassette::recorder::CassetteRecorder;
    use std::sync::{Arc, Mutex};

    #[test]
    fn readings_are_written_in_order() {
        let path = std::env::temp_dir().join("boshupdate_rec_clock_test.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, ports::CLOCK)));
        let manual = ManualClock::at(1_000);
        let clock = RecordingClock::new(Box::new(manual.clone()), Arc::clone(&recorder));

        let first = clock.now();
        manual.advance(chrono::Duration::seconds(5));
        let second = clock.now();
        recorder.lock().unwrap().write().unwrap();

        let cassette = Cassette::load(&path).unwrap();
        assert_eq!(cassette.interactions.len(), 2);
        let replayed: DateTime<Utc> = serde_json::from_value(cassette.interactions[1].output.clone()).unwrap();
        assert_eq!(replayed, second);
        assert!(second > first);
        let _ = std::fs::remove_file(&path);
    }
}
