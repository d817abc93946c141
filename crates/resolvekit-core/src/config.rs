use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional per-project config file.
pub const CONFIG_FILE_NAME: &str = "resolvekit.json";

/// Runtime configuration for the resolvekit CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Install manifest consulted by the authority step, if any.
    pub manifest: Option<PathBuf>,

    /// Collect file dependencies while resolving.
    pub track_dependencies: bool,

    /// Record the per-hook resolution log.
    pub trace: bool,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

/// On-disk shape of `resolvekit.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    manifest: Option<PathBuf>,
    track_dependencies: Option<bool>,
    trace: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            manifest: None,
            track_dependencies: false,
            trace: false,
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Create a config for `cwd`, merging `resolvekit.json` if one exists there.
    ///
    /// A relative `manifest` in the file is taken relative to the file's directory.
    pub fn discover(cwd: PathBuf) -> Result<Self, Error> {
        let path = cwd.join(CONFIG_FILE_NAME);
        let config = Self::new(cwd);
        if !path.is_file() {
            return Ok(config);
        }
        config.merge_file(&path)
    }

    /// Merge settings from a config file on top of this config.
    pub fn merge_file(mut self, path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(manifest) = file.manifest {
            let base = path.parent().unwrap_or(Path::new("."));
            self.manifest = Some(base.join(manifest));
        }
        if let Some(track) = file.track_dependencies {
            self.track_dependencies = track;
        }
        if let Some(trace) = file.trace {
            self.trace = trace;
        }
        Ok(self)
    }

    /// Set the install manifest.
    #[must_use]
    pub fn with_manifest(mut self, manifest: PathBuf) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Enable or disable file dependency tracking.
    #[must_use]
    pub fn with_track_dependencies(mut self, track: bool) -> Self {
        self.track_dependencies = track;
        self
    }

    /// Enable or disable the resolution log.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}
