use colored::Colorize;
use serde::Serialize;
use xkey_crypto::KeyHasher;
use xkey_module::XkeyConfig;
use xkey_types::PurgeMode;

use crate::cli::*;
use crate::scenario::{self, Outcome, Replay, Report};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Replay(args) => cmd_replay(args, config, cli.format),
        Command::Digest(args) => cmd_digest(args, &config, cli.format),
        Command::Config => cmd_config(&config, cli.format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<XkeyConfig> {
    match &cli.config {
        Some(path) => Ok(XkeyConfig::load(path)?),
        None => Ok(XkeyConfig::default()),
    }
}

fn cmd_replay(args: ReplayArgs, config: XkeyConfig, format: OutputFormat) -> anyhow::Result<()> {
    let steps = scenario::load(&args.scenario)?;
    let report = Replay::new(config, args.verify)?.run(&steps)?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &Report) {
    for outcome in &report.outcomes {
        match outcome {
            Outcome::Purged {
                step,
                mode,
                key,
                objects,
            } => {
                let count = if *objects > 0 {
                    objects.to_string().green().bold()
                } else {
                    objects.to_string().dimmed()
                };
                let op = match mode {
                    PurgeMode::Hard => "purge",
                    PurgeMode::Soft => "softpurge",
                };
                println!("  [{step}] {op} {} -> {count}", key.yellow());
            }
            Outcome::Stats { step, stats } => {
                println!("  [{step}] {}", stats.to_string().cyan());
            }
        }
    }
    println!(
        "{} Replayed {} steps: {}",
        "✓".green().bold(),
        report.steps,
        report.final_stats
    );
    if report.verified {
        println!("  Index: {}", "consistent after every step".green());
    }
}

#[derive(Serialize)]
struct DigestLine<'a> {
    key: &'a str,
    digest: String,
}

fn cmd_digest(args: DigestArgs, config: &XkeyConfig, format: OutputFormat) -> anyhow::Result<()> {
    let lines = digest_lines(&args.keys, config);
    match format {
        OutputFormat::Json => print_json(&lines),
        OutputFormat::Text => {
            for line in &lines {
                println!("{}  {}", line.digest.dimmed(), line.key.bold());
            }
            Ok(())
        }
    }
}

fn digest_lines<'a>(keys: &'a [String], config: &XkeyConfig) -> Vec<DigestLine<'a>> {
    let hasher = match &config.digest_domain {
        Some(domain) => KeyHasher::with_domain(domain.clone()),
        None => KeyHasher::new(),
    };
    keys.iter()
        .map(|key| DigestLine {
            key,
            digest: hasher.digest_str(key).to_hex(),
        })
        .collect()
}

fn cmd_config(config: &XkeyConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
