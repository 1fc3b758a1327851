use anyhow::Context;
use clap::Parser;
use dictalog::cli::{Cli, Commands};
use dictalog::config::Config;
use owo_colors::OwoColorize;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        // An explicitly named config file must exist and parse.
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        },
    }
    .with_env_overrides();
    cli.apply_overrides(&mut config);

    match cli.command {
        Some(Commands::Devices) => {
            let devices = dictalog::audio::capture::list_devices()?;
            if devices.is_empty() {
                println!("No audio input devices found.");
            } else {
                for name in devices {
                    println!("{}", name);
                }
            }
        }
        None => {
            let summary = dictalog::app::run(&config, cli.quiet)?;
            println!(
                "Finished recording: {} utterance(s) in {}s. Transcript saved to {}",
                summary.captures,
                summary.elapsed.as_secs(),
                config.run.output.display().green()
            );
        }
    }

    Ok(())
}
