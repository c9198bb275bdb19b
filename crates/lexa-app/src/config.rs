//! Host configuration kept as `config.json` under the platform config dir.
//!
//! The four service endpoints are required. Tunables (timeout, query limit,
//! reveal pacing) fall back to their defaults when left out of a
//! hand-written file. A file is checked on load and again before it is
//! written.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use lexa_consult::SessionConfig;
use lexa_consult::reveal::RevealPacing;
use lexa_core::validation::{DEFAULT_MAX_QUERY_CHARS, QueryLimits};
use lexa_search::SearchEndpoints;
use serde::{Deserialize, Serialize};

/// Schema version this build reads and writes.
pub const CONFIG_VERSION: u32 = 1;

const APP_DIR: &str = "com.lexa.app";
const FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexaConfig {
    pub config_version: u32,
    pub consult_url: String,
    pub search_url: String,
    pub analysis_url: String,
    pub document_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
    #[serde(default)]
    pub reveal: RevealSettings,
    pub created_at: jiff::Timestamp,
}

/// Reveal pacing as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealSettings {
    pub batch_tokens: usize,
    pub delay_ms: u64,
}

impl Default for RevealSettings {
    fn default() -> Self {
        let pacing = RevealPacing::default();
        Self {
            batch_tokens: pacing.batch_tokens,
            delay_ms: pacing.delay.as_millis() as u64,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    lexa_consult::controller::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_max_query_chars() -> usize {
    DEFAULT_MAX_QUERY_CHARS
}

/// `config.json` in the platform config directory.
pub fn default_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join(APP_DIR).join(FILE_NAME))
}

impl LexaConfig {
    /// A fresh config with every service hosted under `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            config_version: CONFIG_VERSION,
            consult_url: format!("{base}/consult"),
            search_url: format!("{base}/search"),
            analysis_url: format!("{base}/analyze"),
            document_url: format!("{base}/documents"),
            request_timeout_secs: default_request_timeout_secs(),
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            reveal: RevealSettings::default(),
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let bytes = std::fs::read(path)
            .wrap_err_with(|| format!("failed to read config at {}", path.display()))?;
        let config: Self = serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("config at {} is not valid", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn load_default() -> eyre::Result<Self> {
        Self::load(&default_path()?)
    }

    /// Write atomically: a temp file in the target directory is filled,
    /// synced, and renamed over `path`. On Unix the file is owner-only.
    pub fn save(&self, path: &Path) -> eyre::Result<()> {
        self.validate()?;
        let dir = path
            .parent()
            .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .wrap_err_with(|| format!("failed to replace config at {}", path.display()))?;

        tracing::info!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn save_default(&self) -> eyre::Result<()> {
        self.save(&default_path()?)
    }

    /// Reject settings the services could not run with.
    pub fn validate(&self) -> eyre::Result<()> {
        if self.config_version > CONFIG_VERSION {
            eyre::bail!(
                "config_version {} was written by a newer Lexa (this build reads {CONFIG_VERSION})",
                self.config_version
            );
        }
        eyre::ensure!(
            self.config_version == CONFIG_VERSION,
            "unsupported config_version {}",
            self.config_version
        );

        for (field, url) in [
            ("consult_url", &self.consult_url),
            ("search_url", &self.search_url),
            ("analysis_url", &self.analysis_url),
            ("document_url", &self.document_url),
        ] {
            let parsed =
                reqwest::Url::parse(url).wrap_err_with(|| format!("{field} is not a URL: {url:?}"))?;
            eyre::ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                "{field} must use http or https, got {url:?}"
            );
        }

        eyre::ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be positive");
        eyre::ensure!(self.max_query_chars > 0, "max_query_chars must be positive");
        eyre::ensure!(self.reveal.batch_tokens > 0, "reveal.batch_tokens must be positive");
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: self.request_timeout(),
            limits: QueryLimits {
                max_chars: self.max_query_chars,
            },
            pacing: RevealPacing {
                batch_tokens: self.reveal.batch_tokens,
                delay: Duration::from_millis(self.reveal.delay_ms),
            },
        }
    }

    pub fn search_endpoints(&self) -> SearchEndpoints {
        SearchEndpoints {
            search_url: self.search_url.clone(),
            analysis_url: self.analysis_url.clone(),
            document_url: self.document_url.clone(),
        }
    }
}
