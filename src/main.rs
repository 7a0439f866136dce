//! Application entry point — televoice CLI.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] (default on first run) and apply CLI overrides.
//! 4. Build the audio front-end and the MFCC extractor.
//! 5. Load the golden pattern cache, building it when missing.
//! 6. Run the subcommand; `batch` drives a multi-thread tokio runtime.
//! 7. Exit with an [`ExitCode`].

mod exit_codes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use exit_codes::ExitCode;
use log::{error, info, warn};

use televoice::{
    audio::{frontend_for, AudioFrontend, DecoderBackend},
    classify::classify,
    config::{AppConfig, AppPaths},
    features::{FeatureExtractor, MfccExtractor},
    library::{build_library, load_or_build, save_library, ReferenceLibrary, StoreError},
    matcher::SearchMode,
    pipeline::{BatchRunner, Identifier},
    report::{save_csv, write_dataset, RunDetails},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// televoice - telephone call tone and voice identification
#[derive(Parser, Debug)]
#[command(name = "televoice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of golden .wav patterns
    #[arg(long, global = true)]
    golden_dir: Option<PathBuf>,

    /// Audio decoder: symphonia or ffmpeg
    #[arg(long, global = true)]
    decoder: Option<DecoderBackend>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Identify one audio file
    Identify {
        /// Target audio file
        file: PathBuf,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Identify every audio file under a directory
    Batch {
        /// Directory searched recursively
        dir: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Files identified concurrently (1 = sequential)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write the CSV report
        #[arg(long)]
        csv: bool,

        /// Directory for the CSV report (defaults to the platform data dir)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Write the distance dataset as JSON to this path
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Do not print one line per file
        #[arg(short, long)]
        quiet: bool,
    },
    /// Manage the golden pattern cache
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// Rebuild the cache from the golden .wav files
    Build,
    /// List the reference patterns
    Show,
}

#[derive(Args, Debug, Clone, Default)]
struct SearchArgs {
    /// Stop once a distance falls below this value
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Stride between candidate offsets, in frames
    #[arg(short, long)]
    scan_step: Option<usize>,

    /// sequential, short-circuit or parallel
    #[arg(short, long)]
    mode: Option<SearchMode>,
}

impl SearchArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(t) = self.threshold {
            config.search.threshold = Some(t);
        }
        if let Some(k) = self.scan_step {
            config.search.scan_step = k;
        }
        if let Some(m) = self.mode {
            config.search.mode = m;
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let exit_code = run(cli);
    std::process::exit(exit_code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(ExitCode::InvalidArguments, format!("{e:#}")),
    };
    if let Some(dir) = &cli.golden_dir {
        config.library.golden_dir = dir.clone();
    }
    if let Some(decoder) = cli.decoder {
        config.audio.decoder = decoder;
    }

    match cli.command {
        Commands::Identify { file, search } => {
            search.apply(&mut config);
            identify(config, &file)
        }
        Commands::Batch {
            dir,
            search,
            workers,
            csv,
            report_dir,
            dataset,
            quiet,
        } => {
            search.apply(&mut config);
            if let Some(n) = workers {
                config.batch.workers = n;
            }
            let reports = Reports {
                csv,
                report_dir,
                dataset,
            };
            batch(config, &dir, reports, !quiet)
        }
        Commands::Library { action } => library(config, action),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(p) => AppConfig::load_from(p)
            .with_context(|| format!("failed to load config from {}", p.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    Ok(config)
}

fn fail(code: ExitCode, message: impl std::fmt::Display) -> ExitCode {
    error!("{message}");
    code
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

struct Engine {
    frontend: Arc<dyn AudioFrontend>,
    extractor: Arc<dyn FeatureExtractor>,
}

fn engine(config: &AppConfig) -> Result<Engine, ExitCode> {
    if let Err(e) = config.validate() {
        return Err(fail(ExitCode::InvalidArguments, format!("invalid configuration: {e}")));
    }
    let frontend = frontend_for(config.audio.decoder, config.audio.sample_rate, config.audio.channel)
        .map_err(|e| {
            let code = if e.is_frontend_unavailable() {
                ExitCode::DecoderUnavailable
            } else {
                ExitCode::GeneralError
            };
            fail(code, e)
        })?;
    Ok(Engine {
        frontend,
        extractor: Arc::new(MfccExtractor::new(config.features.clone())),
    })
}

fn store_failure(e: StoreError) -> ExitCode {
    if matches!(&e, StoreError::Audio(a) if a.is_frontend_unavailable()) {
        return fail(ExitCode::DecoderUnavailable, e);
    }
    fail(ExitCode::GeneralError, format!("golden patterns: {e}"))
}

fn load_references(config: &AppConfig, engine: &Engine) -> Result<Arc<ReferenceLibrary>, ExitCode> {
    let library = load_or_build(
        &config.library.golden_dir,
        &config.library.cache_path(),
        config.library.retry_policy(),
        engine.frontend.as_ref(),
        engine.extractor.as_ref(),
    )
    .map_err(store_failure)?;
    info!("{} golden patterns loaded", library.len());
    Ok(Arc::new(library))
}

fn identifier(config: &AppConfig) -> Result<Identifier, ExitCode> {
    let engine = engine(config)?;
    let library = load_references(config, &engine)?;
    Ok(Identifier::new(
        engine.frontend,
        engine.extractor,
        library,
        config.search,
        config.classifier,
    ))
}

// ---------------------------------------------------------------------------
// identify
// ---------------------------------------------------------------------------

fn identify(config: AppConfig, file: &Path) -> ExitCode {
    let identifier = match identifier(&config) {
        Ok(i) => i,
        Err(code) => return code,
    };

    let result = match identifier.identify_file(file) {
        Ok(r) => r,
        Err(e) if e.is_frontend_unavailable() => return fail(ExitCode::DecoderUnavailable, e),
        Err(e) => return fail(ExitCode::GeneralError, e),
    };

    print!("{}", result.distances);
    println!();
    match &result.classification {
        Ok(c) => {
            println!("{:30}{}", "Matched", c.best_match);
            println!("{:30}{:.2}", "Difference", c.best_value);
            println!("{:30}{:.2}", "Max Result Difference", c.mrd);
            println!("{:30}{}", "Result Type", c.category);
            println!("{:30}{:.5}(s)", "Identify Time", result.elapsed.as_secs_f64());
            ExitCode::Success
        }
        Err(e) => fail(
            ExitCode::ClassificationImpossible,
            format!("{}: {e}", file.display()),
        ),
    }
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

struct Reports {
    csv: bool,
    report_dir: Option<PathBuf>,
    dataset: Option<PathBuf>,
}

fn batch(config: AppConfig, dir: &Path, reports: Reports, display: bool) -> ExitCode {
    let identifier = match identifier(&config) {
        Ok(i) => Arc::new(i),
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(ExitCode::GeneralError, format!("failed to create tokio runtime: {e}")),
    };

    let runner = BatchRunner::new(identifier, config.batch.workers).with_display(display);
    let outcome = match runtime.block_on(runner.run_dir(dir, &config.batch.extensions)) {
        Ok(o) => o,
        Err(e) => return fail(ExitCode::InvalidArguments, format!("{}: {e}", dir.display())),
    };

    if outcome.frontend_unavailable() {
        return fail(ExitCode::DecoderUnavailable, "audio decoder unavailable");
    }

    for failure in &outcome.failures {
        eprintln!("failed: {failure}");
    }
    if let Some(acc) = outcome.accuracy() {
        info!(
            "{} / {} correct ({:.1}%)",
            outcome.correct(),
            outcome.identifications.len(),
            acc * 100.0
        );
    }

    if reports.csv {
        let details = RunDetails::new(
            outcome.elapsed,
            config.search.threshold,
            config.search.scan_step,
            config.search.mode,
            config.batch.workers,
        );
        let report_dir = reports
            .report_dir
            .unwrap_or_else(|| AppPaths::new().reports_dir);
        if let Err(e) = std::fs::create_dir_all(&report_dir) {
            return fail(ExitCode::GeneralError, format!("{}: {e}", report_dir.display()));
        }
        match save_csv(&report_dir, &outcome.identifications, &details) {
            Ok(path) => println!("report: {}", path.display()),
            Err(e) => return fail(ExitCode::GeneralError, e),
        }
    }
    if let Some(path) = reports.dataset {
        if let Err(e) = write_dataset(&path, &outcome.identifications) {
            return fail(ExitCode::GeneralError, e);
        }
    }

    if outcome.identifications.is_empty() && !outcome.failures.is_empty() {
        let all_unclassified = outcome
            .failures
            .iter()
            .all(|f| f.is_classification_failure());
        return if all_unclassified {
            ExitCode::ClassificationImpossible
        } else {
            ExitCode::GeneralError
        };
    }
    ExitCode::Success
}

// ---------------------------------------------------------------------------
// library
// ---------------------------------------------------------------------------

fn library(config: AppConfig, action: LibraryAction) -> ExitCode {
    let engine = match engine(&config) {
        Ok(e) => e,
        Err(code) => return code,
    };

    match action {
        LibraryAction::Build => {
            let cache = config.library.cache_path();
            let built = build_library(
                &config.library.golden_dir,
                engine.frontend.as_ref(),
                engine.extractor.as_ref(),
            )
            .and_then(|library| save_library(&cache, &library).map(|()| library));
            match built {
                Ok(library) => {
                    println!("{} patterns written to {}", library.len(), cache.display());
                    ExitCode::Success
                }
                Err(e) => store_failure(e),
            }
        }
        LibraryAction::Show => {
            let library = match load_references(&config, &engine) {
                Ok(l) => l,
                Err(code) => return code,
            };
            for pattern in library.iter() {
                println!(
                    "{:30}{:>8} frames × {}",
                    pattern.name,
                    pattern.features.len(),
                    pattern.features.dim()
                );
            }
            // Every reference should be closest to itself.
            for pattern in library.iter() {
                let distances = match televoice::matcher::identify(
                    &pattern.features,
                    &library,
                    &config.search,
                ) {
                    Ok(d) => d,
                    Err(e) => return fail(ExitCode::GeneralError, e),
                };
                if let Ok(c) = classify(&distances, &config.classifier) {
                    if c.best_match != pattern.name {
                        warn!("{} is closest to {}", pattern.name, c.best_match);
                    }
                }
            }
            ExitCode::Success
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify the CLI definition is valid
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_identify_with_search_flags() {
        let cli = Cli::try_parse_from([
            "televoice",
            "identify",
            "bu_0001.mp3",
            "--threshold",
            "1500",
            "--scan-step",
            "3",
            "--mode",
            "parallel",
        ])
        .unwrap();
        match cli.command {
            Commands::Identify { file, search } => {
                assert_eq!(file, PathBuf::from("bu_0001.mp3"));
                assert_eq!(search.threshold, Some(1500.0));
                assert_eq!(search.scan_step, Some(3));
                assert_eq!(search.mode, Some(SearchMode::Parallel));
            }
            _ => panic!("Expected Identify command"),
        }
    }

    #[test]
    fn parse_batch_defaults() {
        let cli = Cli::try_parse_from(["televoice", "batch", "test_audio"]).unwrap();
        match cli.command {
            Commands::Batch {
                dir,
                workers,
                csv,
                dataset,
                quiet,
                ..
            } => {
                assert_eq!(dir, PathBuf::from("test_audio"));
                assert!(workers.is_none());
                assert!(!csv);
                assert!(dataset.is_none());
                assert!(!quiet);
            }
            _ => panic!("Expected Batch command"),
        }
    }

    #[test]
    fn parse_global_options() {
        let cli = Cli::try_parse_from([
            "televoice",
            "library",
            "show",
            "--decoder",
            "ffmpeg",
            "--golden-dir",
            "/srv/golden",
        ])
        .unwrap();
        assert_eq!(cli.decoder, Some(DecoderBackend::Ffmpeg));
        assert_eq!(cli.golden_dir, Some(PathBuf::from("/srv/golden")));
        assert!(matches!(
            cli.command,
            Commands::Library {
                action: LibraryAction::Show
            }
        ));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["televoice", "identify", "a.wav", "--mode", "random"]).is_err());
    }

    #[test]
    fn search_args_override_config() {
        let mut config = AppConfig::default();
        SearchArgs {
            threshold: Some(1500.0),
            scan_step: None,
            mode: Some(SearchMode::SequentialShortCircuit),
        }
        .apply(&mut config);
        assert_eq!(config.search.threshold, Some(1500.0));
        assert_eq!(config.search.scan_step, 1);
        assert_eq!(config.search.mode, SearchMode::SequentialShortCircuit);
    }
}
