mod app;
mod catalog;
mod coupling;
mod editor;
mod error;
mod geometry;
mod interaction;
mod model;
mod scene;
mod svg;
mod template;

use std::str::FromStr;

use clap::Parser;
use log::{LevelFilter, debug, info};

#[derive(Parser, Debug)]
#[command(version, about = "Graphical abstract editor")]
struct Args {
    /// Settings file (TOML or JSON)
    #[arg(short, long)]
    settings: Option<String>,

    /// Built-in template to open, e.g. groundRadiation
    #[arg(short, long)]
    template: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting graphical abstract editor");
    debug!(args:?; "Parsed arguments");

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Graphical Abstract Editor",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(app::GraphicAbstractApp::new(
                cc,
                args.settings,
                args.template,
            )))
        }),
    )
}
