//! Where televoice keeps its own files.
//!
//! Only two things live outside the working directory: `settings.toml`, in
//! the per-user config dir, and CSV batch reports written without an
//! explicit `--report-dir`, in a `reports/` folder of the local data dir.
//! Golden patterns and their cache stay wherever `library.golden_dir`
//! points.
//!
//! On Linux that is `~/.config/televoice/settings.toml` and
//! `~/.local/share/televoice/reports/`; `dirs` picks the matching
//! locations on macOS and Windows.

use std::path::PathBuf;

const APP_DIR: &str = "televoice";

/// Resolved locations of the settings file and the default report folder.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml` inside `config_dir`.
    pub settings_file: PathBuf,
    /// Default destination of `batch --csv`.
    pub reports_dir: PathBuf,
}

impl AppPaths {
    /// Resolve against the current user's platform directories, or `./televoice`
    /// when the platform reports none (e.g. no home directory in a container).
    pub fn new() -> Self {
        let base = |dir: Option<PathBuf>| dir.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);

        let config_dir = base(dirs::config_dir());
        Self {
            settings_file: config_dir.join("settings.toml"),
            reports_dir: base(dirs::data_local_dir()).join("reports"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
