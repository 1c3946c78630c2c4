use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lightjump::TransitionConfig;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "lightjump=info".into()))
        .with(fmt::layer())
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match TransitionConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match lightjump::run(config) {
        // The outcome is already logged; a missing next scene does not make
        // the transition itself fail.
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "transition failed");
            ExitCode::FAILURE
        }
    }
}
