//! ActivityRunner CLI Entry Point
//!
//! Provides command-line interface for running workflow steps.
//!
//! # Usage
//!
//! ```bash
//! # Run every step of a workflow file
//! activityrunner welcome.yaml
//!
//! # Dry run mode (preview steps)
//! activityrunner welcome.yaml --dry-run
//!
//! # Write delivered messages to the outbox directory
//! activityrunner welcome.yaml --outbox
//!
//! # ...or to a specific directory
//! activityrunner welcome.yaml --outbox-dir /var/spool/activityrunner
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};

use activityrunner::activity::ActivityRegistry;
use activityrunner::execution::Engine;
use activityrunner::messaging::{JobWorker, LogChannel, MemoryJobQueue, MessageService, OutboxChannel};
use activityrunner::workflow::parser::load_workflow;
use activityrunner::{APP_NAME, VERSION};

/// Default workflow file used when none is specified.
const DEFAULT_WORKFLOW: &str = "workflow.yaml";

/// Where the outbox channel writes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outbox {
    /// Resolved from the environment once logging is up
    Default,
    Dir(PathBuf),
}

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    workflow_path: Option<String>,
    dry_run: bool,
    outbox: Option<Outbox>,
    verbose: bool,
}

impl Config {
    fn workflow_path(&self) -> &str {
        self.workflow_path.as_deref().unwrap_or(DEFAULT_WORKFLOW)
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Workflow Activity Execution Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: activityrunner [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>     Path to workflow YAML file (default: {})", DEFAULT_WORKFLOW);
    println!();
    println!("Options:");
    println!("  --dry-run           Preview steps without executing them");
    println!("  --outbox            Write messages to the outbox directory");
    println!("                      (${{ACTIVITYRUNNER_OUTBOX}} or ./outbox)");
    println!("  --outbox-dir PATH   Write messages to PATH");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  activityrunner welcome.yaml");
    println!("  activityrunner welcome.yaml --dry-run");
    println!("  activityrunner welcome.yaml --outbox-dir /tmp/mail");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => {
                config.dry_run = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--outbox" => {
                config.outbox = Some(Outbox::Default);
            }
            "--outbox-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--outbox-dir requires a path argument".to_string());
                }
                config.outbox = Some(Outbox::Dir(PathBuf::from(&args[i])));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.workflow_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.workflow_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    if config.dry_run {
        info!("Mode: DRY RUN (no messages will be sent or queued)");
        println!();
    }

    let workflow_path = config.workflow_path();
    info!("Loading workflow: {}", workflow_path);
    let workflow = load_workflow(workflow_path).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!("Could not load workflow from '{}': {}", workflow_path, e)
    })?;

    let channel: Arc<dyn MessageService> = match config.outbox {
        Some(ref outbox) => {
            let channel = match outbox {
                Outbox::Default => OutboxChannel::with_default_dir(),
                Outbox::Dir(dir) => OutboxChannel::new(dir),
            };
            info!("Message channel: outbox at {}", channel.dir().display());
            Arc::new(channel)
        }
        None => {
            info!("Message channel: log");
            Arc::new(LogChannel::new())
        }
    };

    let queue = Arc::new(MemoryJobQueue::new());
    let registry = ActivityRegistry::with_builtin(Arc::clone(&channel), queue.clone());

    info!(
        "Workflow loaded: {} steps, activities: {}",
        workflow.steps.len(),
        workflow.activities.join(", ")
    );

    let worker = JobWorker::spawn(queue, channel);

    let mut engine = Engine::new(workflow, registry);
    engine.set_dry_run(config.dry_run);
    let result = engine.run();

    // Queued messages are still delivered when a later step faults.
    let stats = worker.shutdown()?;
    result?;

    if stats.delivered + stats.failed + stats.skipped > 0 {
        println!(
            "Queued jobs: {} delivered, {} failed, {} skipped",
            stats.delivered, stats.failed, stats.skipped
        );
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
