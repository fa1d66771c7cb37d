//! Serves recorded interactions back, in order, per port and method.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Replays the interactions of one or more cassettes.
///
/// Each `(port, method)` pair has its own queue, so calls on different
/// methods may interleave differently from the recording.
#[derive(Debug, Default)]
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Creates a replayer over `cassette`.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut replayer = Self::default();
        replayer.extend(cassette);
        replayer
    }

    /// Queues the interactions of another cassette after the current ones.
    pub fn extend(&mut self, cassette: &Cassette) {
        for interaction in &cassette.interactions {
            self.queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
    }

    /// Takes the next interaction recorded for `port` and `method`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the pair, and the pairs still available,
    /// when the cassette has no more interactions for it.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Result<Interaction, String> {
        let key = (port.to_string(), method.to_string());
        if let Some(interaction) = self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(interaction);
        }
        let mut available: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|((p, m), _)| format!("{p}::{m}"))
            .collect();
        available.sort();
        Err(format!(
            "cassette exhausted for {port}::{method}; remaining: [{}]",
            available.join(", ")
        ))
    }
}
