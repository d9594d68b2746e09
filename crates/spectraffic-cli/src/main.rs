//! spectraffic CLI - synthetic HTTP test cases from OpenAPI/Swagger documents

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use spectraffic_core::{Config, Sheet};
use spectraffic_synth::SpecRun;

use storage::{BatchEntry, BatchSuccess};

#[derive(Parser)]
#[command(name = "spectraffic")]
#[command(about = "Generate synthetic HTTP test cases from OpenAPI/Swagger specifications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .spectraffic.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// RNG seed, overrides the config
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Output directory, overrides the config
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate rows and assemble test cases for one specification
    Generate {
        spec: PathBuf,

        /// Keep placeholders and ede_info bodies as written
        #[arg(long)]
        raw: bool,
    },

    /// Enumerate rows only
    Rows { spec: PathBuf },

    /// Assemble test cases from a saved sheet
    Assemble {
        sheet: PathBuf,

        /// Keep placeholders and ede_info bodies as written
        #[arg(long)]
        raw: bool,
    },

    /// Generate every specification in a directory
    Batch {
        dir: PathBuf,

        /// Worker threads
        #[arg(short, long, default_value_t = 2)]
        jobs: usize,

        /// Pause after each document, in seconds
        #[arg(long, default_value_t = 0.0)]
        pace_secs: f64,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the test-case document
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    if let Some(dir) = &cli.out_dir {
        cfg.output_dir.clone_from(dir);
    }
    Ok(cfg)
}

fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Generate { spec, raw } => {
            let cfg = load_config(&cli)?;
            let run = SpecRun::from_config(&cfg)?;
            tracing::info!(seed = run.seed(), "generation started");

            let rows = run.rows(spec)?;
            let stem = storage::stem(spec);
            let sheet_path = storage::save_rows(&cfg.output_dir, &stem, &rows)?;
            let (assembly, unresolved) = if *raw {
                (run.assemble_raw(&rows.sheet, &cfg), 0)
            } else {
                run.assemble(&rows.sheet, &cfg)
            };
            let cases_path =
                storage::save_test_cases(&cfg.output_dir, &stem, &assembly.test_cases)?;

            let warnings = rows.validation_warnings.len()
                + rows.enumeration_warnings.len()
                + assembly.warnings.len();
            match cli.output {
                OutputFormat::Terminal => {
                    eprintln!("Spec:       {} (OpenAPI {})", spec.display(), rows.version);
                    eprintln!("Seed:       {}", run.seed());
                    eprintln!(
                        "Rows:       {} in {} groups -> {}",
                        rows.row_count(),
                        rows.groups.len(),
                        sheet_path.display()
                    );
                    eprintln!(
                        "Test cases: {} -> {}",
                        assembly.test_cases.len(),
                        cases_path.display()
                    );
                    if warnings > 0 || unresolved > 0 {
                        eprintln!("Warnings:   {warnings}, unresolved placeholders: {unresolved}");
                    }
                }
                OutputFormat::Json => {
                    let summary = serde_json::json!({
                        "spec": spec.display().to_string(),
                        "version": rows.version.to_string(),
                        "seed": run.seed(),
                        "rows": rows.row_count(),
                        "groups": rows.groups.len(),
                        "test_cases": assembly.test_cases.len(),
                        "warnings": warnings,
                        "unresolved": unresolved,
                        "files": {
                            "sheet": sheet_path.display().to_string(),
                            "test_cases": cases_path.display().to_string(),
                        },
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Rows { spec } => {
            let cfg = load_config(&cli)?;
            let run = SpecRun::from_config(&cfg)?;
            let rows = run.rows(spec)?;
            let sheet_path = storage::save_rows(&cfg.output_dir, &storage::stem(spec), &rows)?;

            match cli.output {
                OutputFormat::Terminal => {
                    for group in &rows.groups {
                        eprintln!(
                            "  [{}] {} ({} rows)",
                            group.sequence_id,
                            group.operation,
                            group.rows.len()
                        );
                    }
                    for warning in &rows.enumeration_warnings {
                        eprintln!("  WARNING: {warning}");
                    }
                    eprintln!("Rows: {} -> {}", rows.row_count(), sheet_path.display());
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows.groups)?),
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Assemble { sheet, raw } => {
            let cfg = load_config(&cli)?;
            let run = SpecRun::from_config(&cfg)?;
            let grid = Sheet::read(sheet)?;
            let (assembly, unresolved) = if *raw {
                (run.assemble_raw(&grid, &cfg), 0)
            } else {
                run.assemble(&grid, &cfg)
            };
            let stem = storage::stem(sheet);
            let stem = stem.trim_end_matches(".rows");
            let path = storage::save_test_cases(&cfg.output_dir, stem, &assembly.test_cases)?;

            match cli.output {
                OutputFormat::Terminal => {
                    for warning in &assembly.warnings {
                        eprintln!("  WARNING: {warning}");
                    }
                    eprintln!(
                        "Test cases: {} -> {} (unresolved placeholders: {unresolved})",
                        assembly.test_cases.len(),
                        path.display()
                    );
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&assembly.test_cases)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Batch {
            dir,
            jobs,
            pace_secs,
        } => {
            let cfg = load_config(&cli)?;
            let run = SpecRun::from_config(&cfg)?;
            let specs = spec_files(dir)?;
            if specs.is_empty() {
                eprintln!("No specifications (*.json, *.yaml, *.yml) in {}", dir.display());
                return Ok(1);
            }

            let pace = Duration::try_from_secs_f64(*pace_secs)
                .with_context(|| format!("invalid --pace-secs {pace_secs}"))?;
            let entries = run_batch(&run, &cfg, &specs, (*jobs).max(1), pace);
            let report = storage::save_report(&cfg.output_dir, run.seed(), &entries)?;

            let failed = entries.iter().filter(|e| e.result.is_err()).count();
            if cli.output == OutputFormat::Terminal {
                for entry in &entries {
                    match &entry.result {
                        Ok(ok) => eprintln!(
                            "  OK   {} ({} test cases, {:.2}s)",
                            entry.spec.display(),
                            ok.test_cases,
                            entry.duration_secs
                        ),
                        Err(e) => eprintln!("  FAIL {}: {e}", entry.spec.display()),
                    }
                }
                eprintln!(
                    "\n{} documents, {} failed. Report: {}",
                    entries.len(),
                    failed,
                    report.display()
                );
            } else if cli.output == OutputFormat::Json {
                println!("{}", std::fs::read_to_string(&report)?);
            }
            Ok(if failed > 0 { 1 } else { 0 })
        }

        Commands::Init => {
            let config_path = ".spectraffic.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - output_dir: where sheets and test cases go");
            println!("  - seed: fixed seed for reproducible output");
            println!("  - environment: values for config.<key> hosts");
            Ok(0)
        }

        Commands::Schema => {
            let schema = spectraffic_core::testcase::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}

/// Specification files directly inside `dir`, sorted by name.
fn spec_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut specs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let is_spec = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "json" | "yaml" | "yml"));
        if path.is_file() && is_spec {
            specs.push(path);
        }
    }
    specs.sort();
    Ok(specs)
}

/// Generate every spec on `jobs` worker threads. Entries come back in input order.
fn run_batch(
    run: &SpecRun,
    cfg: &Config,
    specs: &[PathBuf],
    jobs: usize,
    pace: Duration,
) -> Vec<BatchEntry> {
    let next = AtomicUsize::new(0);
    let done = Mutex::new(Vec::with_capacity(specs.len()));
    let stems = storage::unique_stems(specs);

    std::thread::scope(|s| {
        for _ in 0..jobs.min(specs.len()) {
            s.spawn(|| {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let (Some(spec), Some(stem)) = (specs.get(idx), stems.get(idx)) else {
                        break;
                    };
                    let entry = generate_one(run, cfg, spec, stem, idx);
                    if let Ok(mut done) = done.lock() {
                        done.push((idx, entry));
                    }
                    if !pace.is_zero() {
                        std::thread::sleep(pace);
                    }
                }
            });
        }
    });

    let mut done = done.into_inner().unwrap_or_else(|e| e.into_inner());
    done.sort_by_key(|(idx, _)| *idx);
    done.into_iter().map(|(_, entry)| entry).collect()
}

fn generate_one(run: &SpecRun, cfg: &Config, spec: &Path, stem: &str, idx: usize) -> BatchEntry {
    let start = Instant::now();
    let doc_run = run.clone().with_seed(run.seed().wrapping_add(idx as u64));

    let result = doc_run
        .generate(spec, cfg)
        .map_err(anyhow::Error::from)
        .and_then(|out| {
            storage::save_rows(&cfg.output_dir, stem, &out.rows)?;
            storage::save_test_cases(&cfg.output_dir, stem, &out.assembly.test_cases)?;
            Ok(BatchSuccess {
                rows: out.rows.row_count(),
                test_cases: out.assembly.test_cases.len(),
                warnings: out.rows.validation_warnings.len()
                    + out.rows.enumeration_warnings.len()
                    + out.assembly.warnings.len(),
                unresolved: out.unresolved,
            })
        })
        .map_err(|e| {
            tracing::warn!(spec = %spec.display(), "document failed: {e:#}");
            format!("{e:#}")
        });

    BatchEntry {
        spec: spec.to_path_buf(),
        result,
        duration_secs: start.elapsed().as_secs_f64(),
    }
}
