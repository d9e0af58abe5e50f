//! drillbit - adaptive math practice
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drillbit::config::{drillbit_home, interactions_log_path, Config};
use drillbit::error::exit_codes;
use drillbit::stats::InteractionLog;
use drillbit::storage::FileLearnerStore;

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

// =============================================================================
// CLI Definition
// =============================================================================

/// drillbit - adaptive math practice with Bayesian knowledge tracing
#[derive(Parser)]
#[command(name = "drillbit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Learner to act for
    #[arg(long, short = 'u', global = true, default_value = "default")]
    learner: String,
    /// Subject to practice instead of the configured default
    #[arg(long, short, global = true)]
    subject: Option<String>,
    /// Output as JSON
    #[arg(long, short, global = true)]
    json: bool,
    /// Suppress output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend the next question
    Next,

    /// Submit an answer (exit code 1 when incorrect)
    Answer {
        /// Question ID
        question_id: String,
        /// The answer
        #[arg(allow_hyphen_values = true)]
        answer: String,
    },

    /// Show progress in the active subject
    Progress,

    /// Start a new round, keeping mastery
    Restart,

    /// Delete the learner's saved state
    Reset,

    /// List configured subjects
    Subjects,

    /// Compare two answers without recording anything (exit code 1 when not equivalent)
    Check {
        /// Answer type: numeric, formula or string
        #[arg(long = "type", short = 't', default_value = "formula")]
        answer_type: String,
        /// Reference answer
        #[arg(allow_hyphen_values = true)]
        reference: String,
        /// Submitted answer
        #[arg(allow_hyphen_values = true)]
        submitted: String,
    },

    /// Show the learner's answer history
    History {
        /// Maximum number of entries
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Only list questions answered wrong
        #[arg(long)]
        wrong: bool,
    },

    /// Show answer statistics across learners
    Stats {
        /// Maximum number of learners listed
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Include a summary of the selected learner
        #[arg(long)]
        mine: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("drillbit error: {}", e);
            exit_code(exit_codes::ERROR)
        }
    }
}

/// Log to stderr, filtered by `DRILLBIT_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DRILLBIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, logs to `<drillbit_home>/crash.log` and exits with the error code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("drillbit panic: {}", info);

        if let Some(home) = drillbit_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::ERROR);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> CliResult {
    let cli = Cli::parse();
    let learner = cli.learner.as_str();
    let subject = cli.subject.clone();
    let (json, quiet) = (cli.json, cli.quiet);

    match cli.command {
        Commands::Next => run_next(learner, subject, json, quiet),
        Commands::Answer {
            question_id,
            answer,
        } => run_answer(learner, &question_id, &answer, subject, json, quiet),
        Commands::Progress => run_progress(learner, subject, json, quiet),
        Commands::Restart => run_restart(learner, json, quiet),
        Commands::Reset => run_reset(learner, json, quiet),
        Commands::Subjects => run_subjects(json, quiet),
        Commands::Check {
            answer_type,
            reference,
            submitted,
        } => run_check(&answer_type, &reference, &submitted, json, quiet),
        Commands::History { limit, wrong } => run_history(learner, limit, wrong, json, quiet),
        Commands::Stats { limit, mine } => {
            let learner = mine.then(|| learner.to_string());
            run_stats(learner, limit, json, quiet)
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        exit_code(exit_codes::OK)
    } else {
        exit_code(exit_codes::ERROR)
    }
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

fn interaction_log() -> Result<InteractionLog, Box<dyn std::error::Error>> {
    let path = interactions_log_path().ok_or("could not determine drillbit home directory")?;
    Ok(InteractionLog::new(path))
}

fn run_next(learner: &str, subject: Option<String>, json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::next::{NextCommand, NextOptions};

    let config = Config::load_fail_open();
    let store = FileLearnerStore::new()?;

    let cmd = NextCommand::new(store, config);
    let options = NextOptions {
        json,
        quiet,
        subject,
    };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_answer(
    learner: &str,
    question_id: &str,
    answer: &str,
    subject: Option<String>,
    json: bool,
    quiet: bool,
) -> CliResult {
    use drillbit::cli::answer::{AnswerCommand, AnswerOptions};

    let config = Config::load_fail_open();
    let store = FileLearnerStore::new()?;

    let cmd = AnswerCommand::new(store, config, interaction_log()?);
    let options = AnswerOptions {
        json,
        quiet,
        subject,
    };

    let output = cmd.run(learner, question_id, answer, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(exit_code(output.exit_code()))
}

fn run_progress(learner: &str, subject: Option<String>, json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::progress::{ProgressCommand, ProgressOptions};

    let config = Config::load_fail_open();
    let store = FileLearnerStore::new()?;

    let cmd = ProgressCommand::new(store, config);
    let options = ProgressOptions {
        json,
        quiet,
        subject,
    };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_restart(learner: &str, json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::restart::{RestartCommand, RestartOptions};

    let cmd = RestartCommand::new(FileLearnerStore::new()?);
    let options = RestartOptions { json, quiet };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_reset(learner: &str, json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::reset::{ResetCommand, ResetOptions};

    let cmd = ResetCommand::new(FileLearnerStore::new()?);
    let options = ResetOptions { json, quiet };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_subjects(json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::subjects::{SubjectsCommand, SubjectsOptions};

    let cmd = SubjectsCommand::new(Config::load_fail_open());
    let options = SubjectsOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_check(
    answer_type: &str,
    reference: &str,
    submitted: &str,
    json: bool,
    quiet: bool,
) -> CliResult {
    use drillbit::cli::check::{CheckCommand, CheckOptions};

    let cmd = CheckCommand::new(Config::load_fail_open());
    let options = CheckOptions { json, quiet };

    let output = cmd.run(answer_type, reference, submitted, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(exit_code(output.exit_code()))
}

fn run_history(
    learner: &str,
    limit: Option<usize>,
    wrong_only: bool,
    json: bool,
    quiet: bool,
) -> CliResult {
    use drillbit::cli::history::{HistoryCommand, HistoryOptions};

    let cmd = HistoryCommand::new(interaction_log()?);
    let options = HistoryOptions {
        json,
        quiet,
        limit,
        wrong_only,
    };

    let output = cmd.run(learner, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_stats(learner: Option<String>, limit: Option<usize>, json: bool, quiet: bool) -> CliResult {
    use drillbit::cli::stats::{StatsCommand, StatsOptions};

    let cmd = StatsCommand::new(FileLearnerStore::new()?, interaction_log()?);
    let options = StatsOptions {
        json,
        quiet,
        learner,
        limit,
    };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
