//! Replaying adapter for the clock port.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::next_output;
use crate::cassette::ports;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::Clock;

/// Serves recorded clock readings in order.
///
/// Once the recording runs out the last reading is repeated, so a replayed
/// run that reads the clock more often than the recorded one still sees a
/// consistent time.
pub struct ReplayingClock {
    replayer: Mutex<CassetteReplayer>,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ReplayingClock {
    /// Creates a clock over `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer), last: Mutex::new(None) }
    }
}

impl Clock for ReplayingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().expect("clock lock poisoned");
        let recorded = next_output(&self.replayer, ports::CLOCK, "now")
            .and_then(|output| serde_json::from_value::<DateTime<Utc>>(output).map_err(Into::into));
        let now = match (recorded, *last) {
            (Ok(now), _) => now,
            (Err(_), Some(previous)) => previous,
            (Err(e), None) => {
                tracing::warn!(error = %e, "no recorded clock reading, using epoch");
                DateTime::<Utc>::default()
            }
        };
        *last = Some(now);
        now
    }
}
