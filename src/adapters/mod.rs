//! Port implementations: live backends, cassette recording and replay.

pub mod live;
pub mod recording;
pub mod replaying;

#[cfg(test)]
pub(crate) mod memory;
