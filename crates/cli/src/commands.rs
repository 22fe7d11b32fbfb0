// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use bedtime_config::ConfigManager;
use bedtime_core::{format_clock, StoryModel, StoryPage};
use bedtime_story::{StoryFactory, TemplateStoryFactory};
use clap::ArgMatches;
use console::style;

/// Generates a story of `minutes`, repeatable when a seed is given
pub fn generate_story(minutes: u32, seed: Option<u64>) -> Result<StoryModel> {
    let factory = match seed {
        Some(seed) => TemplateStoryFactory::with_seed(seed),
        None => TemplateStoryFactory::new(),
    };
    factory
        .generate(minutes.saturating_mul(60))
        .context("Failed to generate story")
}

/// Story length requested on the command line, or `default`
pub fn requested_minutes(matches: &ArgMatches, default: u32) -> u32 {
    matches.get_one::<u32>("minutes").copied().unwrap_or(default)
}

/// Generate and print a story
pub fn print_story(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    let default = manager.session().default_duration_minutes;
    let minutes = requested_minutes(matches, default);
    let story = generate_story(minutes, matches.get_one::<u64>("seed").copied())?;

    if matches.get_flag("json") {
        let json = serde_json::to_string_pretty(&story).context("Failed to serialize story")?;
        println!("{}", json);
        return Ok(());
    }

    println!("\n{}", style(story.title()).bold().cyan());
    println!(
        "{} pages, {}",
        story.page_count(),
        format_clock(story.total_duration_seconds())
    );
    println!("{}", "=".repeat(60));
    for (index, page) in story.pages().iter().enumerate() {
        println!("{}", page_heading(index, page));
        println!("  {}", page.text());
        println!();
    }
    Ok(())
}

/// One-line summary of a page: number, length, scene, mood and sounds
pub fn page_heading(index: usize, page: &StoryPage) -> String {
    let sounds: Vec<&str> = page.ambient_sounds().iter().map(|s| s.as_str()).collect();
    format!(
        "{} {} {} / {} [{}]",
        style(format!("{:>2}.", index + 1)).bold(),
        format_clock(page.duration_seconds()),
        page.scene(),
        page.mood(),
        sounds.join(", ")
    )
}

/// Dispatch `config` subcommands
pub fn config(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("init", _)) => {
            if manager.initialize().context("Failed to write config file")? {
                println!(
                    "{} Created {}",
                    style("✓").green().bold(),
                    manager.config_path().display()
                );
            } else {
                println!("Config already exists at {}", manager.config_path().display());
            }
        }
        Some(("show", _)) => {
            let config = manager.load_or_default();
            let text = toml::to_string_pretty(&config).context("Failed to format config")?;
            println!("{}", text);
            if let Err(errors) = config.validate() {
                for error in errors {
                    println!("{} {}", style("!").yellow().bold(), error);
                }
            }
        }
        Some(("path", _)) => println!("{}", manager.config_path().display()),
        Some(("reset", _)) => {
            manager.reset().context("Failed to reset config")?;
            println!("{} Restored defaults", style("✓").green().bold());
        }
        Some(("set", sub_matches)) => {
            let key = required(sub_matches, "key")?;
            let value = required(sub_matches, "value")?;
            set_config_value(manager, key, value)?;
            println!("{} {} = {}", style("✓").green().bold(), key, value);
        }
        _ => bail!("Unknown config command"),
    }
    Ok(())
}

/// Parses, validates and saves one `section.field` value
pub fn set_config_value(manager: &ConfigManager, key: &str, value: &str) -> Result<()> {
    let mut config = manager.load_or_default();
    config
        .set_value(key, value)
        .with_context(|| format!("Cannot set {}", key))?;
    manager
        .save(&config)
        .with_context(|| format!("Rejected {} = {}", key, value))?;
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} is required", name))
}
