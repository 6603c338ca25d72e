mod run;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Collection folder to rename, relative to the photo root.
    pub collection: String,

    /// Photo root directory the collection lives under.
    #[clap(long, default_value = ".")]
    pub root: PathBuf,

    /// Naming template override, e.g. "{date} {seq} {title}".
    #[clap(long)]
    pub template: Option<String>,

    /// Free-text context merged into every AI title request.
    #[clap(long)]
    pub notes: Option<String>,

    /// Apply the reviewed names. Without this flag the run is a dry run
    /// that prints the suggestions for the first page and stops.
    #[clap(long, default_value_t = false, short, action)]
    pub yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    let args = Args::parse();
    let mut settings = app_state::load_app_settings()?;
    if let Some(template) = &args.template {
        settings.naming.template = template.clone();
    }

    run::run(&args, settings).await
}
