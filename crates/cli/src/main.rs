// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use bedtime_config::ConfigManager;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

mod commands;
mod player;

fn build_cli() -> Command {
    Command::new("bedtime")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Timed bedtime stories with music and ambient sound")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("story")
                .about("Generate a story and print it")
                .arg(
                    Arg::new("minutes")
                        .short('m')
                        .long("minutes")
                        .value_name("N")
                        .help("Story length in minutes")
                        .value_parser(value_parser!(u32).range(1..=180)),
                )
                .arg(seed_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the story as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play a generated story")
                .arg(
                    Arg::new("minutes")
                        .short('m')
                        .long("minutes")
                        .value_name("N")
                        .help("Story length in minutes")
                        .value_parser(value_parser!(u32).range(1..=180)),
                )
                .arg(seed_arg())
                .arg(
                    Arg::new("no-music")
                        .long("no-music")
                        .help("Play without background music")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-ambient")
                        .long("no-ambient")
                        .help("Play without ambient sounds")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("volume")
                        .long("volume")
                        .value_name("V")
                        .help("Volume between 0.0 and 1.0")
                        .value_parser(value_parser!(f32)),
                )
                .arg(
                    Arg::new("manual")
                        .long("manual")
                        .help("Turn pages only with n/p")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("tick-ms")
                        .long("tick-ms")
                        .value_name("MS")
                        .help("Length of one story second in milliseconds")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("assets")
                        .long("assets")
                        .value_name("DIR")
                        .help("Directory with one audio file per sound")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("simulate")
                        .long("simulate")
                        .help("Use the in-memory audio backend")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or change the configuration")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config file if none exists"))
                .subcommand(Command::new("show").about("Print the current configuration"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(Command::new("reset").about("Restore the default configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Change one value, e.g. `session.volume 0.5`")
                        .arg(Arg::new("key").required(true).value_name("KEY"))
                        .arg(Arg::new("value").required(true).value_name("VALUE")),
                ),
        )
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .value_name("S")
        .help("Seed for a repeatable story")
        .value_parser(value_parser!(u64))
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<PathBuf>("config-dir") {
        Some(dir) => ConfigManager::with_directory(dir.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to locate the config directory")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    let level = manager.load_or_default().app.log_level;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .init();

    match matches.subcommand() {
        Some(("story", sub_matches)) => commands::print_story(&manager, sub_matches),
        Some(("play", sub_matches)) => player::play(&manager, sub_matches).await,
        Some(("config", sub_matches)) => commands::config(&manager, sub_matches),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
