mod app;
mod authorizer;
mod commands;
mod config;
mod effects;
mod logging;
mod render;

use std::path::PathBuf;

use clap::Parser;
use uploader_core::Route;
use uploader_logging::upl_info;

use crate::config::AppConfig;
use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the bulk uploader backend")]
struct Cli {
    /// RON config file; defaults to ./uploader.ron when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `backend_url` from the config.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    log: LogDestination,

    #[arg(long)]
    verbose: bool,

    /// Screen to open first, e.g. /projects/12/edit
    #[arg(default_value = "/projects/")]
    route: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.backend_url = url;
    }
    upl_info!("using backend {}", config.backend_url);

    app::run(config, Route::parse(&cli.route))
}
