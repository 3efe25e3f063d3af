//! Dashboard configuration
//!
//! File-backed settings (region location, producer layout, initial delay)
//! plus the validated runtime values built from them at startup.

use crate::telemetry::layout::RegionLayout;
use crate::telemetry::region::RegionSource;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "ISCSI_TOP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "iscsi_top.toml";

/// Refresh interval in whole seconds, always within 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshDelay(u64);

impl RefreshDelay {
    pub const MIN_SECS: i64 = 1;
    pub const MAX_SECS: i64 = 10;

    /// Values outside 1..=10 reset to 1, not to the nearest bound.
    pub fn clamped(secs: i64) -> Self {
        if (Self::MIN_SECS..=Self::MAX_SECS).contains(&secs) {
            Self(secs as u64)
        } else {
            Self(Self::MIN_SECS as u64)
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for RefreshDelay {
    fn default() -> Self {
        Self(Self::MIN_SECS as u64)
    }
}

impl std::fmt::Display for RefreshDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Settings loaded from `iscsi_top.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopConfig {
    /// Initial refresh interval in seconds (1-10)
    #[serde(default = "default_delay_secs")]
    pub delay_secs: i64,

    /// Open regions as files in this directory instead of via shm_open
    #[serde(default)]
    pub shm_dir: Option<PathBuf>,

    /// Producer build capacities
    #[serde(default)]
    pub layout: RegionLayout,
}

fn default_delay_secs() -> i64 {
    1
}

impl Default for TopConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            shm_dir: None,
            layout: RegionLayout::default(),
        }
    }
}

impl TopConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `ISCSI_TOP_CONFIG` or the default path. Only a missing file
    /// falls back to defaults; a file that exists but cannot be read or
    /// parsed is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(&path)
    }

    fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("Cannot load config {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Using default iscsi-top config ({}): {}", path.display(), e);
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Cannot load config {}", path.display())),
        }
    }

    fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn region_source(&self) -> RegionSource {
        match &self.shm_dir {
            Some(dir) => RegionSource::Directory(dir.clone()),
            None => RegionSource::Shm,
        }
    }

    pub fn initial_delay(&self) -> RefreshDelay {
        RefreshDelay::clamped(self.delay_secs)
    }
}

/// Runtime settings, fixed at startup except for the delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub instance_id: u32,
    pub delay: RefreshDelay,
}

impl DashboardConfig {
    pub fn new(instance_id: u32, delay: RefreshDelay) -> Self {
        Self { instance_id, delay }
    }
}
