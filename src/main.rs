use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;

mod analysis;
mod app;
mod config;
mod error;
mod gemini;
mod handler;
mod image_prep;
mod model;
mod tui;
mod ui;

use app::App;
use config::Config;
use gemini::GeminiClient;
use model::AnalysisResult;

#[derive(Parser)]
#[command(name = "kwminer")]
#[command(about = "Etsy keyword research with Gemini-powered quadrant analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Gemini model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Tui {
        /// Product images to load on startup
        images: Vec<PathBuf>,
    },
    /// Generate keyword phrases to research, from product images
    Ideas {
        /// Product image files
        #[arg(short, long = "image", required = true)]
        images: Vec<PathBuf>,
    },
    /// Run the full analysis and print the report
    Analyze {
        /// Product image files
        #[arg(short, long = "image", required = true)]
        images: Vec<PathBuf>,
        /// File with raw keyword research text (eRank/Etsy export)
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Save API key or default model to the config file
    Config {
        /// Gemini API key to store
        #[arg(long)]
        set_key: Option<String>,
        /// Default model to store
        #[arg(long)]
        set_model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();

    if let Some(Commands::Config { set_key, set_model }) = &cli.command {
        if set_key.is_none() && set_model.is_none() {
            println!("Nothing to save. Pass --set-key and/or --set-model.");
            return Ok(());
        }
        if let Some(key) = set_key {
            config.gemini_api_key = Some(key.clone());
        }
        if let Some(model) = set_model {
            config.default_model = Some(model.clone());
        }
        config.save()?;
        println!("{}", "Config saved.".green());
        return Ok(());
    }

    let api_key = config.resolve_api_key().ok_or_else(|| {
        anyhow!(
            "No Gemini API key found. Set GEMINI_API_KEY or run: kwminer config --set-key <KEY>"
        )
    })?;
    let client = GeminiClient::new(&api_key);
    let model = cli.model.unwrap_or_else(|| config.resolve_model());

    match cli.command.unwrap_or(Commands::Tui { images: vec![] }) {
        Commands::Tui { images } => {
            let prepared = image_prep::prepare_batch(&images)?;
            run_tui(App::new(client, model, prepared)).await?;
        }
        Commands::Ideas { images } => {
            let prepared = image_prep::prepare_batch(&images)?;
            println!(
                "🤖 Asking {} for search phrases...\n",
                model.bold().magenta()
            );
            let suggestions = analysis::generate_keyword_ideas(&client, &model, &prepared).await?;
            if suggestions.is_empty() {
                println!("{}", "The model returned no suggestions.".yellow());
            }
            for (i, phrase) in suggestions.iter().enumerate() {
                println!("{:>3}. {}", (i + 1).to_string().blue(), phrase);
            }
        }
        Commands::Analyze { images, data } => {
            let prepared = image_prep::prepare_batch(&images)?;
            let raw_data = std::fs::read_to_string(&data)?;
            println!("🤖 Running analysis with {}...\n", model.bold().magenta());
            let result = analysis::analyze_seo_data(&client, &model, &prepared, &raw_data).await?;
            print_report(&result);
        }
        Commands::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        } else {
            break;
        }
    }

    tui::restore()?;
    Ok(())
}

fn print_report(result: &AnalysisResult) {
    let ctx = &result.product_context;
    let kind = if ctx.is_physical { "Physical" } else { "Digital" };
    println!("{}", "Product".bold().green());
    println!("  Niche: {}  Type: {}  Style: {}\n", ctx.niche.bold(), kind, ctx.visual_style);

    println!("{}", "Keywords (by search volume)".bold().green());
    let mut rows: Vec<_> = result.keywords.iter().collect();
    rows.sort_by(|a, b| {
        b.search_volume
            .partial_cmp(&a.search_volume)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for record in rows {
        println!(
            "  {:<14} {:<34} {:>10.0} {:>10.0}  {}",
            record.quadrant.label(),
            record.keyword,
            record.search_volume,
            record.competition,
            record.reason.dimmed()
        );
    }

    println!("\n{}", "Value Analysis".bold().green());
    println!("{}\n", result.value_analysis);
    println!("{}", "Pricing Strategy".bold().green());
    println!("{}\n", result.pricing_strategy);

    println!("{}", "Search These Next".bold().green());
    for step in &result.next_steps {
        println!("  • {}", step.cyan());
    }
}
