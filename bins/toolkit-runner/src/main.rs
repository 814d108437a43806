mod config;
mod docker_cli;
mod engine;
mod evaluator;
mod runner;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{TestCaseCatalog, DEFAULT_CATALOG_PATH};
use docker_cli::{DockerCliEngine, DEFAULT_DOCKER_BIN};
use engine::{ActionEngine, DockerEngine};
use runner::{report, TestCaseRunner};
use std::collections::BTreeMap;
use std::path::PathBuf;
use toolkit_common::image::{self, DEFAULT_VARIANT};
use toolkit_common::paths::resolve_path;
use toolkit_common::types::{SuccessCriterion, TestCase, Verdict};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "toolkit-runner")]
#[command(about = "Run C++ toolkit action test cases in Docker", long_about = None)]
struct Cli {
    /// Test case catalog (JSON)
    #[arg(long, global = true, default_value = DEFAULT_CATALOG_PATH)]
    catalog: PathBuf,

    /// How to start the toolkit container
    #[arg(long, global = true, value_enum, default_value_t = EngineKind::Api)]
    engine: EngineKind,

    /// docker executable used by the cli engine
    #[arg(long, global = true, default_value = DEFAULT_DOCKER_BIN)]
    docker_bin: PathBuf,

    /// Full image reference; beats ACTION_CXX_TOOLKIT_IMAGE
    #[arg(long, global = true)]
    image: Option<String>,

    /// Toolkit image tag (e.g. gcc12-ubuntu22.04)
    #[arg(long, global = true, default_value = DEFAULT_VARIANT)]
    variant: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EngineKind {
    /// Docker Engine API over the local socket
    Api,
    /// `docker run` through the command line client
    Cli,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one test case from the catalog
    Run {
        /// Test case name
        name: String,
    },

    /// Run every catalog test case, one after another
    RunAll,

    /// Run an ad-hoc test case
    Exec {
        /// Workspace mounted into the container
        #[arg(short, long)]
        workdir: String,

        /// Action input as name=value (repeatable)
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,

        /// Artifact that must exist afterwards; exit status decides otherwise
        #[arg(short, long)]
        expect_file: Option<PathBuf>,

        /// Path removed before the run and after a passing one (repeatable)
        #[arg(short, long)]
        cleanup: Vec<PathBuf>,
    },

    /// List catalog test cases
    List,

    /// List published toolkit image variants
    Images,
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid input '{}': expected name=value", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid input '{}': empty name", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

fn init_tracing() {
    // stdout carries container output and the status blocks only
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cases = match &cli.command {
        Commands::List => return list_cases(&cli.catalog),
        Commands::Images => {
            list_images(&cli);
            return Ok(());
        }
        Commands::Run { name } => {
            let catalog = TestCaseCatalog::load(&cli.catalog)?;
            vec![catalog.get(name)?.resolve()?]
        }
        Commands::RunAll => {
            let catalog = TestCaseCatalog::load(&cli.catalog)?;
            catalog
                .cases()
                .iter()
                .map(|spec| spec.resolve())
                .collect::<Result<Vec<_>>>()?
        }
        Commands::Exec {
            workdir,
            inputs,
            expect_file,
            cleanup,
        } => {
            let working_directory = resolve_path(workdir)?;
            let success = match expect_file {
                Some(path) => SuccessCriterion::FileExists { path: path.clone() },
                None => SuccessCriterion::ExitCodeZero,
            };
            vec![TestCase::new(
                "exec",
                working_directory,
                inputs.iter().cloned().collect::<BTreeMap<_, _>>(),
                success,
                cleanup.clone(),
            )?]
        }
    };

    if cli.image.is_none() && !image::is_known_variant(&cli.variant) {
        warn!(variant = %cli.variant, "Not a published toolkit variant");
    }
    let image_ref = image::image_from_env(cli.image.as_deref(), &cli.variant);
    info!(image = %image_ref, engine = ?cli.engine, cases = cases.len(), "Toolkit runner starting");

    let verdict = match cli.engine {
        EngineKind::Api => match DockerEngine::new(image_ref) {
            Ok(engine) => {
                info!(image = %engine.image(), "Using Docker Engine API");
                run_cases(&TestCaseRunner::new(engine), &cases).await?
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "Docker engine unavailable");
                fail_all(&cases)?
            }
        },
        EngineKind::Cli => {
            let engine = DockerCliEngine::new(cli.docker_bin.clone(), image_ref);
            run_cases(&TestCaseRunner::new(engine), &cases).await?
        }
    };

    if !verdict.is_pass() {
        std::process::exit(verdict.exit_code());
    }
    Ok(())
}

/// Run cases in order, printing one status block each
async fn run_cases<E: ActionEngine>(runner: &TestCaseRunner<E>, cases: &[TestCase]) -> Result<Verdict> {
    let mut overall = Verdict::Pass;
    for case in cases {
        let verdict = match runner.run(case).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(test_case = %case.name, error = %format!("{:#}", e), "Test case aborted");
                Verdict::Fail
            }
        };

        report(&mut std::io::stdout().lock(), verdict).context("Failed to write status")?;
        if !verdict.is_pass() {
            overall = Verdict::Fail;
        }
    }

    if cases.len() > 1 {
        info!(total = cases.len(), any_failed = !overall.is_pass(), "All test cases finished");
    }
    Ok(overall)
}

/// Report every case as failed without invoking anything
fn fail_all(cases: &[TestCase]) -> Result<Verdict> {
    for _ in cases {
        report(&mut std::io::stdout().lock(), Verdict::Fail).context("Failed to write status")?;
    }
    Ok(Verdict::Fail)
}

fn list_cases(catalog_path: &std::path::Path) -> Result<()> {
    let catalog = TestCaseCatalog::load(catalog_path)?;

    if catalog.cases().is_empty() {
        println!("No test cases in {}", catalog_path.display());
        return Ok(());
    }

    println!("{:<16} {:<16} {:<28} {}", "Name", "Criterion", "Workspace", "Description");
    println!("{}", "─".repeat(90));
    for case in catalog.cases() {
        let criterion = match &case.success {
            SuccessCriterion::ExitCodeZero => "exit code 0".to_string(),
            SuccessCriterion::FileExists { path } => format!("file {}", path.display()),
        };
        println!(
            "{:<16} {:<16} {:<28} {}",
            case.name,
            criterion,
            case.working_directory,
            case.description.as_deref().unwrap_or("")
        );
    }
    println!("\nTotal: {} test case(s)", catalog.cases().len());
    Ok(())
}

fn list_images(cli: &Cli) {
    println!("Selected image: {}", image::image_from_env(cli.image.as_deref(), &cli.variant));
    println!("\nPublished variants:");
    for tag in image::variants() {
        let marker = if tag == cli.variant { "*" } else { " " };
        println!(" {} {}", marker, tag);
    }
}
