//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::options::RenderOptions;

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Usage tracking and quota service.
    pub analytics: AnalyticsCfg,
    /// Initial render options and regeneration timing.
    pub render: RenderCfg,
    /// Where exported images are written.
    pub export: ExportCfg,
}

/// Analytics/quota service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsCfg {
    /// Disable to run fully offline.
    pub enabled: bool,
    /// Service root, without trailing slash.
    pub base_url: String,
    /// Project tag sent with every event.
    pub project: String,
    /// Daily ceiling passed to the quota check.
    pub daily_limit: u32,
    /// Monthly ceiling passed to the quota check.
    pub monthly_limit: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

/// Starting render options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCfg {
    /// Image width in pixels (128..=512, step 64).
    pub size_px: u32,
    /// Dark module color.
    pub foreground: String,
    /// Light module color.
    pub background: String,
    /// Quiet time after the last edit before the preview is regenerated.
    pub debounce_ms: u64,
}

/// Export destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportCfg {
    /// Directory receiving `qrcode-<type>.<ext>` files.
    pub output_dir: String,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl RenderCfg {
    /// Options the session starts with.
    pub fn initial_options(&self) -> RenderOptions {
        RenderOptions::new(
            self.size_px,
            self.foreground.clone(),
            self.background.clone(),
        )
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AnalyticsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://dashboard.bi-gen.it".into(),
            project: "qr-code".into(),
            daily_limit: 100,
            monthly_limit: 1000,
            timeout_secs: 10,
        }
    }
}

impl Default for RenderCfg {
    fn default() -> Self {
        Self {
            size_px: 256,
            foreground: "#000000".into(),
            background: "#FFFFFF".into(),
            debounce_ms: 150,
        }
    }
}

impl Default for ExportCfg {
    fn default() -> Self {
        Self {
            output_dir: ".".into(),
        }
    }
}
