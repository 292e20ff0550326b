mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eframe::egui;

use app::MusicDashboardApp;
use music_dashboard::data::filter::GenreSelection;
use music_dashboard::pipeline::{run_pipeline, DashboardParams, TableCache};
use music_dashboard::PipelineConfig;

#[derive(Parser)]
#[command(name = "music-dashboard")]
#[command(about = "Explore genre popularity and audio features of a track dataset")]
#[command(version)]
struct Cli {
    /// Dataset archive (zip holding one CSV); overrides the config file
    #[arg(short, long, global = true)]
    archive: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive dashboard (default)
    Gui,

    /// Run the pipeline once and print a JSON report
    Report {
        /// Genre to include; repeat for several. None means all genres.
        #[arg(short, long = "genre")]
        genres: Vec<String>,

        /// Number of genres in the ranking (clamped to the configured range)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(archive) = cli.archive {
        config.archive = archive;
    }

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => run_gui(config),
        Command::Report { genres, top_n } => run_report(config, genres, top_n),
    }
}

fn run_gui(config: PipelineConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Music Popularity Analysis",
        options,
        Box::new(|_cc| Ok(Box::new(MusicDashboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running dashboard: {e}"))
}

fn run_report(config: PipelineConfig, genres: Vec<String>, top_n: Option<usize>) -> Result<()> {
    let cache = TableCache::new();
    let table = cache
        .get_or_load(&config)
        .with_context(|| format!("loading {}", config.archive.display()))?;

    let selection: GenreSelection = genres.into_iter().collect();
    let params = DashboardParams::new(
        selection,
        top_n.unwrap_or(config.dashboard.top_n_default),
        &config.dashboard,
    );
    let output = run_pipeline(&table, &params, &config).context("running pipeline")?;

    let json = serde_json::to_string_pretty(&output.report(&params)).context("encoding report")?;
    println!("{json}");
    Ok(())
}
