use clap::{Parser, Subcommand};

mod commands;

use commands::{CooldownCommand, RunArgs, SettingsCommand};

#[derive(Parser)]
#[command(name = "funding-arb")]
#[command(about = "Cross-exchange funding rate arbitrage scanner", long_about = None)]
struct Cli {
    /// Config profile merged over config/Config.toml (reads config/Config.{profile}.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll all enabled exchanges and send alerts until Ctrl+C
    Run(RunArgs),
    /// Run a single scan cycle and print its summary
    ScanOnce(RunArgs),
    /// Show or change the spread thresholds
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Inspect or clear per-symbol cooldowns
    #[command(subcommand)]
    Cooldown(CooldownCommand),
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter()).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let config = commands::load_config(cli.profile.as_deref())?;

    match cli.command {
        Commands::Run(args) => commands::run_scanner(config, args).await?,
        Commands::ScanOnce(args) => commands::run_scan_once(config, args).await?,
        Commands::Settings(command) => commands::run_settings(config, command).await?,
        Commands::Cooldown(command) => commands::run_cooldown(config, command).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use funding_arb_core::ThresholdField;
    use rust_decimal_macros::dec;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from(["funding-arb", "run", "--dry-run", "--ephemeral"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.dry_run);
                assert!(args.ephemeral);
                assert!(args.universe.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "funding-arb",
            "scan-once",
            "--profile",
            "staging",
            "--log-file",
            "scan.log",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("staging"));
        assert_eq!(cli.log_file.as_deref(), Some("scan.log"));
        assert!(matches!(cli.command, Commands::ScanOnce(_)));
    }

    #[test]
    fn test_settings_set_parses_field_and_decimal() {
        let cli = Cli::try_parse_from(["funding-arb", "settings", "set", "price_diff", "1.5"]).unwrap();
        match cli.command {
            Commands::Settings(SettingsCommand::Set { field, value }) => {
                assert_eq!(field, ThresholdField::MaxPriceDivergence);
                assert_eq!(value, dec!(1.5));
            }
            _ => panic!("expected settings set"),
        }
    }

    #[test]
    fn test_settings_set_rejects_unknown_field() {
        assert!(Cli::try_parse_from(["funding-arb", "settings", "set", "spread_max", "1"]).is_err());
    }

    #[test]
    fn test_cooldown_clear_requires_symbol() {
        assert!(Cli::try_parse_from(["funding-arb", "cooldown", "clear"]).is_err());
        let cli = Cli::try_parse_from(["funding-arb", "cooldown", "clear", "btc-usdt"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cooldown(CooldownCommand::Clear { ref symbol }) if symbol == "btc-usdt"
        ));
    }
}
