//! Settings file for the `kairos` binary.
//!
//! Stored as RON next to where the tool is run unless `--config` points
//! elsewhere. Durations are kept as plain integers so the file stays easy to
//! edit by hand.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kairos_client::{ClientSettings, PollSettings, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL};
use kairos_logging::{kairos_info, kairos_warn};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::persist::write_atomic;

pub const DEFAULT_CONFIG_FILE: &str = "kairos.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// `None` disables the per-request timeout.
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub max_wait_secs: Option<u64>,
    /// Notebook used when `--notebook` is not given.
    pub last_notebook: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let poll = PollSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.map(|t| t.as_secs()),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: poll.max_attempts,
            max_wait_secs: poll.max_duration.map(|d| d.as_secs()),
            last_notebook: None,
        }
    }
}

impl AppConfig {
    /// Read settings from `path`. A missing file yields the defaults; a file
    /// that cannot be parsed is an error so it is never silently overwritten.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                kairos_info!("no settings file at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("cannot read {}", path.display()));
            }
        };
        ron::from_str(&content).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(self, pretty).context("cannot encode settings")?;
        write_atomic(path, &content)?;
        kairos_info!("settings written to {:?}", path);
        Ok(())
    }

    /// Command-line flags take precedence over the file.
    pub fn overlay(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.url {
            self.base_url = url.clone();
        }
        if let Some(poll_ms) = cli.poll_ms {
            self.poll_interval_ms = poll_ms;
        }
        if let Some(secs) = cli.max_wait_secs {
            self.max_wait_secs = Some(secs);
        }
        self
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        let interval = if self.poll_interval_ms == 0 {
            kairos_warn!("poll interval of 0 ms replaced by the default");
            DEFAULT_POLL_INTERVAL
        } else {
            Duration::from_millis(self.poll_interval_ms)
        };
        PollSettings {
            interval,
            max_attempts: self.max_poll_attempts,
            max_duration: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}

/// Record `notebook_id` as the current notebook in the settings file,
/// keeping everything else the file holds.
pub fn remember_notebook(path: &Path, notebook_id: &str) -> Result<()> {
    let mut stored = AppConfig::load(path)?;
    if stored.last_notebook.as_deref() == Some(notebook_id) {
        return Ok(());
    }
    stored.last_notebook = Some(notebook_id.to_string());
    stored.save(path)
}
