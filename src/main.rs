mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use herald_broadcast::{JsonLineSets, LineSetStore};
use herald_channels::TelegramChannel;
use herald_core::{config, traits::Channel};
use herald_guard::{AdminRoster, Gate, OwnerVerifier};
use herald_memory::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Herald — role-guarded chat automation agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "HERALD_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Herald agent.
    Start,
    /// Check configuration, owner record, and line sets.
    Status,
    /// Recreate the owner record from the configured owner and secret.
    ResetOwner,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg);

    match cli.command {
        Commands::Start => {
            let problems = cfg.validate();
            if !problems.is_empty() {
                for p in &problems {
                    eprintln!("config error: {p}");
                }
                anyhow::bail!("invalid configuration ({} problems)", problems.len());
            }

            // Build channels.
            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

            if let Some(ref tg) = cfg.channel.telegram {
                if tg.enabled {
                    if tg.bot_token.is_empty() {
                        anyhow::bail!(
                            "Telegram is enabled but bot_token is empty. \
                             Set it in config.toml or {} env var.",
                            config::TELEGRAM_TOKEN_ENV
                        );
                    }
                    let channel = TelegramChannel::new(tg);
                    channels.insert("telegram".to_string(), Arc::new(channel));
                }
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            // Build the guard.
            let verifier = Arc::new(OwnerVerifier::open(
                &cfg.owner.id,
                &cfg.owner.secret,
                &cfg.owner_record_path(),
            )?);
            let gate = Arc::new(Gate::new(verifier, &cfg.guard));
            let roster = Arc::new(AdminRoster::open(&cfg.admins_path(), &cfg.guard.admins)?);

            // Build broadcast storage and memory.
            let line_sets: Arc<dyn LineSetStore> = Arc::new(JsonLineSets::new(cfg.lines_dir()));
            let store = Store::new(&cfg.memory).await?;

            println!("{} — Starting agent...", cfg.herald.name);
            let gw = Arc::new(gateway::Gateway::new(
                &cfg, channels, gate, roster, line_sets, store,
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("{} — Status Check\n", cfg.herald.name);
            println!("Config: {}", cli.config);
            println!("Data dir: {}", cfg.data_dir().display());
            println!("Owner: {}", cfg.owner.id);

            let problems = cfg.validate();
            if problems.is_empty() {
                println!("Config: valid");
            } else {
                for p in &problems {
                    println!("  ! {p}");
                }
            }
            println!();

            if let Some(ref tg) = cfg.channel.telegram {
                println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                );
            } else {
                println!("  telegram: not configured");
            }

            if !cfg.owner_record_path().exists() {
                println!("  owner record: not created");
            } else if let Ok(verifier) =
                OwnerVerifier::open(&cfg.owner.id, &cfg.owner.secret, &cfg.owner_record_path())
            {
                let report = verifier.report();
                println!(
                    "  owner record: {}",
                    if report.is_secure() { "secure" } else { "COMPROMISED" }
                );
                println!(
                    "    readable: {} | hash valid: {} | owner matches: {}",
                    report.readable, report.hash_valid, report.owner_id_matches
                );
                if let Some(created) = report.created_at {
                    println!("    created: {}", created.format("%Y-%m-%d %H:%M UTC"));
                }
            } else {
                println!("  owner record: cannot verify (owner id or secret missing)");
            }

            let line_sets = JsonLineSets::new(cfg.lines_dir());
            match line_sets.names() {
                Ok(names) if names.is_empty() => println!("  line sets: none"),
                Ok(names) => println!("  line sets: {}", names.join(", ")),
                Err(e) => println!("  line sets: unreadable ({e})"),
            }
        }
        Commands::ResetOwner => {
            if cfg.owner.secret.is_empty() {
                anyhow::bail!(
                    "owner secret is empty (set [owner].secret or {})",
                    config::OWNER_SECRET_ENV
                );
            }
            let verifier = OwnerVerifier::open(
                &cfg.owner.id,
                &cfg.owner.secret,
                &cfg.owner_record_path(),
            )?;
            let outcome = verifier.emergency_reset()?;
            println!("Owner record recreated for {}.", cfg.owner.id);
            if let Some(backup) = outcome.backup {
                println!("Previous record saved to {}.", backup.display());
            }
        }
    }

    Ok(())
}

/// Console logging plus a daily-rolling file under the data directory.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(cfg: &config::Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.herald.log_level));

    let logs_dir = cfg.logs_dir();
    let file = std::fs::create_dir_all(&logs_dir)
        .ok()
        .map(|_| tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "herald.log")));

    match file {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            eprintln!("warning: cannot create {}, logging to console only", logs_dir.display());
            None
        }
    }
}
