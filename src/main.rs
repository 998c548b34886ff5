use anyhow::Result;
use clap::{CommandFactory, Parser};
use narrat::app::{RunOptions, run_narration};
use narrat::cli::{Cli, Commands, ConfigAction};
use narrat::config::Config;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        None => {
            let config = match load_config(cli.config.as_deref()) {
                Ok(config) => config,
                Err(e) => fail(&e.to_string()),
            };
            let options = RunOptions {
                video: cli.video,
                cycle: cli.cycle,
                fps: cli.fps,
                model: cli.model,
                voice: cli.voice,
                device: cli.device,
                mute: cli.mute,
                timeout_secs: cli.timeout,
                quiet: cli.quiet,
                verbosity: cli.verbose,
            };
            if let Err(e) = run_narration(config, options).await {
                fail(&e.to_string());
            }
        }
        Some(Commands::Config {
            action: ConfigAction::Dump,
        }) => {
            print!("{}", Config::dump_template()?);
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "narrat",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Print an error in red and exit with status 1.
fn fail(message: &str) -> ! {
    eprintln!("{}", format!("Error: {}", message).red());
    std::process::exit(1);
}

/// Diagnostics go to stderr through `tracing`; `RUST_LOG` takes precedence.
fn init_tracing(quiet: bool, verbosity: u8) {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("narrat={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from the given path or the default location.
fn load_config(custom_path: Option<&std::path::Path>) -> narrat::Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}
