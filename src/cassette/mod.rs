//! Cassettes: recorded port interactions, replayed for deterministic runs.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

/// Port names used in cassette interactions.
pub mod ports {
    /// The clock port.
    pub const CLOCK: &str = "clock";
    /// The source-control port.
    pub const GITHUB: &str = "github";
    /// The director port.
    pub const DIRECTOR: &str = "director";

    /// Every recorded port, in file-name order.
    pub const ALL: [&str; 3] = [CLOCK, DIRECTOR, GITHUB];
}
