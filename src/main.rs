use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod classifier;
mod collector;
mod config;
mod error;
mod models;
mod output;
mod pipeline;
mod runner;
mod scoring;
mod session;

use crate::config::QuizConfig;
use crate::output::{OutputFormat, ResultReport};
use crate::pipeline::Pipeline;
use crate::runner::Runner;
use crate::session::SessionStore;

/// Smart Career Advisor - answer a short questionnaire and get a career recommendation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML quiz configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the classifier bundle (overrides `model_path` from the config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Comma-separated answers (option numbers or labels) to skip the interactive prompts
    #[arg(short, long)]
    answers: Option<String>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log session and prediction details
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => QuizConfig::from_file(path)?,
        None => QuizConfig::default(),
    };
    let quiz = Arc::new(config.build_quiz().context("Invalid quiz configuration")?);

    let model_path = args.model.as_deref().or(config.model_path.as_deref());
    let pipeline = Pipeline::load(model_path).context("Failed to load the career model")?;
    pipeline.ensure_compatible(&quiz.scale)?;

    let store = Arc::new(SessionStore::new(Arc::clone(&quiz), pipeline));
    let runner = Runner::new(Arc::clone(&store), args.output, config.show_probabilities);

    match &args.answers {
        Some(answers) => {
            let result = runner.run_scripted(answers)?;
            let report = ResultReport::new(&result, &quiz.scale, config.show_probabilities);
            print!("{}", output::render_result(&report, args.output));
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            runner.run_interactive(stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
