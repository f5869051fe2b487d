mod app;
mod cli;

use std::process;
use tracing::Level;
use webrtc_vmaf::config::Config;

fn log_level(verbose: u8, configured: &str) -> Level {
    match verbose {
        0 => configured.parse().unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() {
    let cli = cli::parse();

    // The log level lives in the config, so problems are reported once the subscriber is up
    let (config, config_err) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose, &config.defaults.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {}", e);
    }

    match config_err {
        Some(e) => tracing::warn!("using built-in defaults: {:#}", e),
        None => {
            // Best effort; a read-only config dir still gets built-in defaults
            if let Err(e) = Config::ensure_default() {
                tracing::warn!(
                    error = %format!("{:#}", e),
                    "could not create default config file; run 'webrtc-vmaf init-config' to retry"
                );
            }
        }
    }

    if let Err(e) = app::run(cli, config) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
