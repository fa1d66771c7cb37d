//! A recording session: one cassette file per port in a directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::ports;
use super::recorder::CassetteRecorder;

/// Shared handle to one port's recorder.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Per-port recorders writing `<port>.cassette.yaml` files into a directory.
pub struct RecordingSession {
    /// Recorder for the clock port.
    pub clock: SharedRecorder,
    /// Recorder for the source-control port.
    pub github: SharedRecorder,
    /// Recorder for the director port.
    pub director: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Creates the output directory and one recorder per port.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(output_dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| format!("failed to create cassette directory {}: {e}", output_dir.display()))?;

        let make = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, port)))
        };

        Ok(Self {
            clock: make(ports::CLOCK),
            github: make(ports::GITHUB),
            director: make(ports::DIRECTOR),
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Directory receiving the cassette files.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every port's cassette.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first port whose cassette cannot be written.
    pub fn write(&self) -> Result<(), String> {
        for (port, recorder) in
            [(ports::CLOCK, &self.clock), (ports::GITHUB, &self.github), (ports::DIRECTOR, &self.director)]
        {
            let guard = recorder.lock().map_err(|e| format!("recorder lock for {port} poisoned: {e}"))?;
            guard.write().map_err(|e| format!("failed to write {port} cassette: {e}"))?;
        }
        Ok(())
    }
}
