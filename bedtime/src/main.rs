//! Bedtime story generator.
//!
//! Asks for a story idea, writes a story with Claude, has it judged for
//! safety and quality, and offers one revision.
//!
//! ```bash
//! cargo run -p bedtime -- --request "A turtle who is afraid of the dark" --no-revision
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=bedtime_core=info` to follow each attempt.

mod display;

use anyhow::Context;
use bedtime_core::{StoryConfig, StorySession, MAX_ATTEMPTS};
use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{info_span, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bedtime",
    version,
    about = "Generate a bedtime story for ages 5-10, checked by an LLM judge"
)]
struct Args {
    /// Claude model to use
    #[arg(long, env = "BEDTIME_MODEL")]
    model: Option<String>,

    /// Story request; asked for interactively when omitted
    #[arg(long)]
    request: Option<String>,

    /// Revision request to apply without asking
    #[arg(long, conflicts_with = "no_revision")]
    revision: Option<String>,

    /// Skip the revision step
    #[arg(long)]
    no_revision: bool,

    /// Generate-and-judge attempts, at most 3
    #[arg(long, default_value_t = MAX_ATTEMPTS)]
    attempts: usize,

    /// Print the final result as JSON
    #[arg(long)]
    json: bool,
}

/// Where prompts and progress go. With `--json`, stdout carries only the result.
struct Console {
    json: bool,
}

impl Console {
    fn say(&self, text: &str) {
        if self.json {
            eprintln!("{text}");
        } else {
            println!("{text}");
        }
    }

    fn ask(&self, question: &str) -> io::Result<String> {
        if self.json {
            eprint!("{question}");
            io::stderr().flush()?;
        } else {
            print!("{question}");
            io::stdout().flush()?;
        }

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = StoryConfig::new().with_max_attempts(args.attempts);
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }

    let mut session = StorySession::from_env(config)
        .context("Please set ANTHROPIC_API_KEY in a .env file or the environment")?;

    let span = info_span!("story_session", session_id = %session.id());
    run(&mut session, &args).instrument(span).await
}

async fn run(session: &mut StorySession, args: &Args) -> anyhow::Result<()> {
    let console = Console { json: args.json };
    console.say(display::BANNER);
    console.say("");

    let request = match &args.request {
        Some(request) => request.clone(),
        None => console.ask("What kind of story would you like to hear? ")?,
    };

    console.say("\nPreparing your story request...");
    let brief = session
        .normalize(&request)
        .await
        .context("Could not prepare the story request")?;
    console.say(&display::brief_summary(brief));
    console.say("");

    console.say("Generating and evaluating story (this may take a moment)...\n");
    let result = session
        .generate()
        .await
        .context("Story generation failed")?;
    if !args.json {
        console.say(&display::result_report(result));
    }

    let revision_request = if args.no_revision {
        None
    } else if let Some(revision) = &args.revision {
        Some(revision.clone())
    } else {
        console.say(&"=".repeat(60));
        let answer = console.ask("\nWould you like to request a revision? (yes/no): ")?;
        if display::is_yes(&answer) {
            Some(console.ask("What would you like to change? ")?)
        } else {
            None
        }
    };

    if let Some(revision_request) = revision_request {
        console.say("\nGenerating revised story...\n");
        let revised = session
            .revise(&revision_request)
            .await
            .context("Revision failed")?;
        if !args.json {
            console.say(&display::result_report(revised));
        }
    }

    if args.json {
        if let Some(result) = session.result() {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
    }

    console.say("");
    console.say(display::FAREWELL);
    Ok(())
}
