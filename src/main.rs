use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod app;
mod client;
mod config;
mod error;
mod handler;
mod input;
mod logging;
mod markdown;
mod models;
mod session;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use app::App;
use client::QueryClient;
use config::{Config, Settings};
use logging::LogTarget;
use session::Session;

#[derive(Parser)]
#[command(name = "consult")]
#[command(version, about = "Terminal chat client for the software consulting RAG agent")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "CONSULT_API_URL")]
    base_url: Option<String>,

    /// Model to query (see `consult models`)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Where the TUI writes its log
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// List the models the backend accepts
    Models,
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = Config::load()?
        .resolve(cli.base_url, cli.model, cli.log_file)?;

    match cli.command {
        None => {
            logging::init(LogTarget::File(&settings.log_file), cli.verbose)?;
            run_tui(&settings).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Ask { question }) => {
            logging::init(LogTarget::Stderr, cli.verbose)?;
            ask(&settings, &question).await
        }
        Some(Commands::Models) => {
            list_models(&settings);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Health) => {
            logging::init(LogTarget::Stderr, cli.verbose)?;
            health(&settings).await
        }
    }
}

async fn run_tui(settings: &Settings) -> Result<()> {
    info!(base_url = %settings.base_url, "starting chat");

    tui::install_panic_hook();
    let mut terminal = tui::init().context("initializing terminal")?;
    let mut app = App::new(settings);
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event);
            app.poll_query_task().await;
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn ask(settings: &Settings, question: &str) -> Result<ExitCode> {
    let model = models::MODELS[settings.model_index].id;
    let client = QueryClient::new(&settings.base_url);
    let mut session = Session::new();

    let Some(request) = session.begin(question, Some(model)) else {
        eprintln!("Nothing to ask.");
        return Ok(ExitCode::FAILURE);
    };
    session.finish(client.query(&request).await);

    if let Some(message) = session.error() {
        eprintln!("Error: {}", message);
        return Ok(ExitCode::FAILURE);
    }
    if let Some(answer) = session.messages().last() {
        println!("{}", answer.content);
    }
    Ok(ExitCode::SUCCESS)
}

fn list_models(settings: &Settings) {
    for (i, model) in models::MODELS.iter().enumerate() {
        let marker = if i == settings.model_index { "*" } else { " " };
        println!("{} {:<22} {}", marker, model.id, model.name);
    }
}

async fn health(settings: &Settings) -> Result<ExitCode> {
    let client = QueryClient::new(&settings.base_url);
    match client.health().await {
        Ok(message) => {
            println!("{}: {}", client.base_url(), message);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "health check failed");
            eprintln!("{} is not reachable: {}", client.base_url(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
