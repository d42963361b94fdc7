use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use reading_tracker::config::TrackerConfig;
use reading_tracker::demos;

#[derive(Parser, Debug)]
#[command(name = "reading-tracker")]
#[command(version)]
#[command(about = "Book, review and reader tracker on SQLite")]
#[command(long_about = "Runs the instructional programs against one SQLite file.

CONFIGURATION:
  Settings are read from ./reading-tracker.toml, or from the file named by
  $READING_TRACKER_CONFIG, unless --config is given:
    [database]
    path = \"db.sqlite\"     # Database file
    echo = false           # Log every statement

    [logging]
    level = \"info\"         # Overridden by RUST_LOG")]
struct Cli {
    /// Which program to run
    #[arg(value_enum, default_value_t = Demo::All)]
    demo: Demo,

    /// Configuration file to load instead of the default search
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Demo {
    Intro,
    Models,
    Query,
    Sessions,
    All,
}

impl Demo {
    fn names(self) -> Vec<&'static str> {
        match self {
            Demo::Intro => vec!["intro"],
            Demo::Models => vec!["models"],
            Demo::Query => vec!["query"],
            Demo::Sessions => vec!["sessions"],
            Demo::All => demos::DEMOS.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TrackerConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: {e}");
            eprintln!("Using default configuration");
            TrackerConfig::default()
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.to_lowercase())),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    info!(
        database = %config.database.path.display(),
        demo = ?cli.demo,
        "starting reading-tracker v{}",
        env!("CARGO_PKG_VERSION")
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for name in cli.demo.names() {
        writeln!(out, "== {name}")?;
        demos::run(name, &config.database, &mut out)
            .with_context(|| format!("demo `{name}` failed"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_all_demos() {
        let cli = Cli::try_parse_from(["reading-tracker"]).unwrap();
        assert_eq!(cli.demo, Demo::All);
        assert!(cli.config.is_none());
        assert_eq!(cli.demo.names(), demos::DEMOS.to_vec());
    }

    #[test]
    fn test_demo_and_config() {
        let cli =
            Cli::try_parse_from(["reading-tracker", "query", "--config", "tracker.toml"]).unwrap();
        assert_eq!(cli.demo, Demo::Query);
        assert_eq!(cli.config, Some(PathBuf::from("tracker.toml")));
        assert_eq!(cli.demo.names(), vec!["query"]);
    }

    #[test]
    fn test_misspelled_flag_is_rejected() {
        let err = Cli::try_parse_from(["reading-tracker", "--confg", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_unknown_demo_is_rejected() {
        let err = Cli::try_parse_from(["reading-tracker", "nope"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
