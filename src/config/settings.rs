//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`: a partial `settings.toml` fills the rest from
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::{DecoderBackend, TARGET_SAMPLE_RATE};
use crate::classify::ClassifierConfig;
use crate::features::MfccParams;
use crate::library::RetryPolicy;
use crate::matcher::SearchParams;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Decoding settings for targets and golden files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate every signal is resampled to, in Hz.
    pub sample_rate: u32,
    /// Source channel kept (0 = left, the called party on recorded calls).
    pub channel: usize,
    /// Which decoder reads the files.
    pub decoder: DecoderBackend,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            channel: 0,
            decoder: DecoderBackend::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// LibraryConfig
// ---------------------------------------------------------------------------

/// Where golden patterns live and how their cache is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the golden `*.wav` files.
    pub golden_dir: PathBuf,
    /// Cache file name, created inside `golden_dir`.
    pub cache_file: String,
    /// Read attempts while the cache looks mid-write.
    pub retry_attempts: u32,
    /// Pause between read attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            golden_dir: PathBuf::from("golden_wav"),
            cache_file: "golden_patterns.json".into(),
            retry_attempts: 20,
            retry_delay_ms: 100,
        }
    }
}

impl LibraryConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.golden_dir.join(&self.cache_file)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

/// Directory-run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Files identified concurrently; `<= 1` runs sequentially.
    pub workers: usize,
    /// Extensions picked up by discovery, case-insensitive.
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            extensions: vec!["wav".into(), "mp3".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use televoice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan step, threshold and search mode.
    pub search: SearchParams,
    /// "typical" band and category normalisation.
    pub classifier: ClassifierConfig,
    /// MFCC front-end parameters.
    pub features: MfccParams,
    pub audio: AudioConfig,
    pub library: LibraryConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.search.scan_step == 0 {
            bail!("search.scan_step must be >= 1");
        }
        if let Some(t) = self.search.threshold {
            if !t.is_finite() || t < 0.0 {
                bail!("search.threshold must be a non-negative number, got {t}");
            }
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be > 0");
        }
        if self.classifier.typical_band.is_nan() || self.classifier.typical_band < 0.0 {
            bail!("classifier.typical_band must be a non-negative number");
        }
        if self.classifier.category_segments == 0 {
            bail!("classifier.category_segments must be >= 1");
        }
        if self.features.num_cep == 0 || self.features.num_filters < self.features.num_cep {
            bail!("features.num_cep must be in 1..=num_filters");
        }
        if self.library.cache_file.is_empty() {
            bail!("library.cache_file must not be empty");
        }
        if self.batch.extensions.is_empty() {
            bail!("batch.extensions must list at least one extension");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
