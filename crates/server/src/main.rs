use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use mira_encoder_server::config::ServerConfig;

/// Face-encoding service for student photos.
#[derive(Parser)]
#[command(name = "mira-encoder")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "MIRA_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Supabase service key.
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: String,

    /// Storage bucket holding photos and bundles.
    #[arg(long, env = "MIRA_BUCKET", default_value = "mira")]
    bucket: String,

    /// Directory for per-request scratch space (default: system temp dir).
    #[arg(long, env = "MIRA_WORKSPACE_DIR")]
    workspace_dir: Option<PathBuf>,

    /// Directory with pre-fetched face models.
    #[arg(long, env = "MIRA_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Timeout for each storage request, in seconds.
    #[arg(long, default_value = "30")]
    store_timeout_secs: u64,

    /// Budget for a whole encode or merge request, in seconds (0 = none).
    #[arg(long, default_value = "300")]
    request_deadline_secs: u64,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind: self.bind,
            supabase_url: self.supabase_url,
            supabase_key: self.supabase_key,
            bucket: self.bucket,
            workspace_dir: self.workspace_dir.unwrap_or(defaults.workspace_dir),
            model_dir: self.model_dir,
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            request_deadline: (self.request_deadline_secs > 0)
                .then(|| Duration::from_secs(self.request_deadline_secs)),
            confidence: self.confidence,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config();
    config.validate()?;
    mira_encoder_server::run(config)
}
