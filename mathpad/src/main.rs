use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mathpad::{parse_line, MathpadConfig, RemoteEvaluator, TerminalSink};
use mathpad_core::{
    notation, CalcEngine, EditEvent, EventResult, Presented, ThreadedEvaluator,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How long to block on the evaluator per wait step.
const WAIT_STEP: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "mathpad")]
#[command(about = "Compose expressions, preview them as typeset markup, evaluate remotely")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Evaluation service URL, overrides the configuration
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the markup for an expression
    Render {
        /// Expression text, e.g. "(1+2)/3"
        expression: String,
        /// Format the input as a numeric evaluation result
        #[arg(long)]
        result: bool,
    },
    /// Replay keypad labels and show the display after each
    Keys {
        /// Keypad labels, e.g. 8 ÷ 2 =
        #[arg(num_args = 1..)]
        labels: Vec<String>,
    },
    /// Interactive session
    Repl,
}

type Session = CalcEngine<ThreadedEvaluator>;

fn load_config(cli: &Cli) -> Result<MathpadConfig> {
    let mut config = match &cli.config {
        Some(path) => MathpadConfig::load_toml(path)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("loading {}", path.display()))?,
        None => MathpadConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.set_endpoint(endpoint);
    }
    Ok(config)
}

fn start_session(config: &MathpadConfig) -> Result<Session> {
    let remote = RemoteEvaluator::from_config(config)?;
    let evaluator = ThreadedEvaluator::spawn(remote).context("starting evaluator thread")?;
    Ok(CalcEngine::with_config(evaluator, config.base.clone()))
}

/// Wait for an outstanding evaluation, then fire due timers.
fn settle(session: &mut Session, limit: Duration) {
    let deadline = Instant::now() + limit;
    while session.is_awaiting() && Instant::now() < deadline {
        if let Some(response) = session.evaluator_mut().wait_response(WAIT_STEP) {
            session.apply_response(response);
        }
    }
    if session.is_awaiting() {
        tracing::warn!("evaluator did not answer in time");
    }
    session.poll();
}

fn handle_render_command(config: &MathpadConfig, expression: &str, result: bool) -> Result<()> {
    let markup = if result {
        let value: f64 = expression
            .trim()
            .parse()
            .with_context(|| format!("{expression:?} is not a number"))?;
        notation::result_to_markup(value, &config.base.result_format)
    } else {
        notation::transform(expression)
    };
    println!("{markup}");
    Ok(())
}

fn handle_keys_command(config: &MathpadConfig, labels: &[String]) -> Result<()> {
    let mut session = start_session(config)?;
    // The service has its own timeout; leave room for it to report.
    let limit = config.timeout() + Duration::from_millis(250);

    for label in labels {
        let Some(result) = session.process_label(label) else {
            eprintln!("⚠ unknown key {label:?}");
            continue;
        };
        if matches!(result, EventResult::Dispatched { .. }) {
            settle(&mut session, limit);
        }
        let ctx = session.context();
        println!("{:>4}  {:<20}  {}", label, ctx.text, ctx.markup);
    }
    Ok(())
}

fn run_repl(config: &MathpadConfig) -> Result<()> {
    let mut session = start_session(config)?;
    let mut sink = TerminalSink::stdout();
    let limit = config.timeout() + Duration::from_millis(250);

    println!("mathpad - type keys (e.g. 8÷2 =), AC to clear, :q to quit");
    println!("evaluator: {}", config.endpoint);
    session.present(&mut sink);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == ":q" {
            break;
        }

        // Timers may have come due while waiting for input.
        session.poll();

        let events = match parse_line(line) {
            Ok(events) => events,
            Err(err) => {
                eprintln!("⚠ {err}");
                continue;
            }
        };
        for event in events {
            if session.process_event(event) == EventResult::Rejected {
                tracing::debug!(?event, "key rejected");
            }
            if event == EditEvent::Commit {
                settle(&mut session, limit);
            }
        }

        if session.present(&mut sink) == Presented::RawText {
            tracing::debug!("shown as raw text");
        }
        if session.context().is_error() {
            let delay = session.config().error_clear_delay();
            println!("    (clears in {:.1}s)", delay.as_secs_f64());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("MATHPAD_LOG"))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Render { expression, result } => {
            handle_render_command(&config, expression, *result)
        }
        Commands::Keys { labels } => handle_keys_command(&config, labels),
        Commands::Repl => run_repl(&config),
    }
}
