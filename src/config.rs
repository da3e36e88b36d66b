use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const NVIDIA_SETTINGS: &str = "/usr/bin/nvidia-settings";
const DRM_ROOT: &str = "/sys/class/drm";
const PROCESS_TIMEOUT_SECS: u64 = 5;

// Helper configuration, every field falls back to its default when missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Path of the Nvidia configuration utility
    pub nvidia_settings: PathBuf,
    // Directory holding the DRM card entries of the AMD driver
    pub drm_root: PathBuf,
    // How long an external command may run before it's killed
    pub process_timeout_secs: u64,
}

impl Config {
    // Load the configuration from a Json file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Parsing config file at: {:?}", path);

        let file = File::open(path).with_context(|| {
            format!("Failed to open Json configuration file {:?}", path)
        })?;

        let buf = BufReader::new(file);

        let config: Config = serde_json::from_reader(buf).with_context(|| {
            format!("Failed to parse Json configuration file {:?}", path)
        })?;

        trace!("Current config: {:?}", config);

        Ok(config)
    }

    // Use the given file if any, the defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nvidia_settings: PathBuf::from(NVIDIA_SETTINGS),
            drm_root: PathBuf::from(DRM_ROOT),
            process_timeout_secs: PROCESS_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = Config::load_or_default(None).unwrap();

        assert_eq!(config.nvidia_settings, PathBuf::from(NVIDIA_SETTINGS));
        assert_eq!(config.drm_root, PathBuf::from(DRM_ROOT));
        assert_eq!(config.process_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = config_file(r#"{ "drm_root": "/tmp/drm", "unknown": 1 }"#);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.drm_root, PathBuf::from("/tmp/drm"));
        assert_eq!(config.nvidia_settings, PathBuf::from(NVIDIA_SETTINGS));
        assert_eq!(config.process_timeout_secs, PROCESS_TIMEOUT_SECS);
    }

    #[test]
    fn full_file() {
        let file = config_file(
            r#"{
                "nvidia_settings": "/opt/nvidia/bin/nvidia-settings",
                "drm_root": "/tmp/drm",
                "process_timeout_secs": 10
            }"#,
        );
        let config = Config::load_or_default(Some(file.path())).unwrap();

        assert_eq!(
            config.nvidia_settings,
            PathBuf::from("/opt/nvidia/bin/nvidia-settings")
        );
        assert_eq!(config.process_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = config_file("{ not json");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/gpuclockctl.json");
        assert!(Config::load_or_default(Some(path)).is_err());
    }
}
