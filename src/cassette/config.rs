//! Locating cassettes for replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::ports;
use super::replayer::CassetteReplayer;

/// Cassette files to replay, per port. A port without a file is not
/// replayed; calls on it fail.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Clock cassette.
    pub clock: Option<PathBuf>,
    /// Source-control cassette.
    pub github: Option<PathBuf>,
    /// Director cassette.
    pub director: Option<PathBuf>,
}

/// One replayer per port.
#[derive(Debug, Default)]
pub struct PortReplayers {
    /// Clock replayer.
    pub clock: CassetteReplayer,
    /// Source-control replayer.
    pub github: CassetteReplayer,
    /// Director replayer.
    pub director: CassetteReplayer,
}

impl CassetteConfig {
    /// Finds the `<port>.cassette.yaml` files a recording session left in `dir`.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Self {
        let find = |port: &str| {
            let path = dir.join(format!("{port}.cassette.yaml"));
            path.exists().then_some(path)
        };
        Self { clock: find(ports::CLOCK), github: find(ports::GITHUB), director: find(ports::DIRECTOR) }
    }

    /// Uses a single cassette holding every port's interactions.
    #[must_use]
    pub fn monolithic(path: &Path) -> Self {
        Self {
            clock: Some(path.to_path_buf()),
            github: Some(path.to_path_buf()),
            director: Some(path.to_path_buf()),
        }
    }

    /// Loads the configured cassettes.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        let load = |path: Option<&Path>| -> Result<CassetteReplayer, String> {
            path.map_or_else(|| Ok(CassetteReplayer::default()), |p| Ok(CassetteReplayer::new(&Cassette::load(p)?)))
        };
        Ok(PortReplayers {
            clock: load(self.clock.as_deref())?,
            github: load(self.github.as_deref())?,
            director: load(self.director.as_deref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::recorder::CassetteRecorder;
    use serde_json::json;

    #[test]
    fn from_dir_picks_existing_port_files() {
        let dir = std::env::temp_dir().join("boshupdate_cassette_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let mut recorder = CassetteRecorder::new(dir.join("github.cassette.yaml"), "github");
        recorder.record("github", "list_tags", json!({}), json!({"Ok": []}));
        recorder.write().unwrap();

        let config = CassetteConfig::from_dir(&dir);
        assert!(config.github.is_some());
        assert!(config.clock.is_none());

        let mut replayers = config.load_all().unwrap();
        assert!(replayers.github.next_interaction("github", "list_tags").is_ok());
        assert!(replayers.clock.next_interaction("clock", "now").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
