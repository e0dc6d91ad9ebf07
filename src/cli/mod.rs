pub mod activities;
pub mod dashboard;
pub mod filter;
pub mod output;
pub mod profile;
pub mod sessions;
pub mod shutdown;

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
};

use activities::{process_activity_command, ActivityCommand};
use anyhow::Result;
use chrono::Locale;
use clap::{CommandFactory, Parser, Subcommand};
use filter::{process_filter_command, FilterCommand};
use output::bucketing::TimeScale;
use shutdown::detect_shutdown;
use tokio_util::sync::CancellationToken;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    storage::{key_value::FileKeyValueStore, tracker_storage::TrackerStorage},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

const STORE_DIR: &str = "store";

#[derive(Parser, Debug)]
#[command(name = "Stint", version, long_about = None)]
#[command(about = "Track time spent on your activities", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to stdout")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Level of the log file, e.g. debug. Falls back to RUST_LOG and then info"
    )]
    log_filter: Option<LevelFilter>,
    #[arg(
        long,
        global = true,
        default_value = "en_US",
        value_parser = parse_locale,
        help = "Locale of day and month names, e.g. de_DE"
    )]
    locale: Locale,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Set your name and finish onboarding")]
    Welcome { name: String },
    #[command(about = "Show your name and how much is stored")]
    Profile {},
    #[command(about = "Manage activities")]
    Activity {
        #[command(subcommand)]
        command: ActivityCommand,
    },
    #[command(about = "Start a session for an activity")]
    Start { activity_id: String },
    #[command(about = "Stop the running session of an activity")]
    Stop { activity_id: String },
    #[command(about = "Show running sessions")]
    Status {
        #[arg(long, short, help = "Keep updating every second until Ctrl-C")]
        watch: bool,
    },
    #[command(about = "Show tracked hours over the last days, weeks or months")]
    Dashboard {
        #[arg(long, short, default_value_t = TimeScale::Weekly)]
        scale: TimeScale,
    },
    #[command(about = "Choose which activities the dashboard includes")]
    Filter {
        #[command(subcommand)]
        command: FilterCommand,
    },
    #[command(about = "Write all data into a JSON file")]
    Export {
        #[arg(long, short, help = "Directory of the export. Defaults to the current one")]
        output: Option<PathBuf>,
    },
    #[command(about = "Delete all stored data")]
    Clear {
        #[arg(long, help = "Confirm the deletion")]
        yes: bool,
    },
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    Locale::try_from(value).map_err(|_| format!("Unknown locale {value}"))
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        args.log_filter
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;
    debug!("Using application directory {}", app_dir.display());

    let storage = TrackerStorage::new(
        FileKeyValueStore::new(app_dir.join(STORE_DIR))?,
        Box::new(DefaultClock),
    );
    let locale = args.locale;
    let colored = io::stdout().is_terminal();
    let mut out = io::stdout();

    if !matches!(
        args.commands,
        Commands::Welcome { .. } | Commands::Clear { .. }
    ) && !storage.has_completed_onboarding().await
    {
        eprintln!("Tip: introduce yourself with `stint welcome <NAME>`");
    }

    match args.commands {
        Commands::Welcome { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        "Name can't be empty",
                    )
                    .into());
            }
            profile::welcome(&storage, name, &mut out).await
        }
        Commands::Profile {} => profile::print_profile(&storage, &mut out).await,
        Commands::Activity { command } => {
            let now = storage.clock().local_time();
            process_activity_command(&storage, command, &now, locale, colored, &mut out).await
        }
        Commands::Start { activity_id } => {
            sessions::start_activity(&storage, &activity_id, &mut out).await
        }
        Commands::Stop { activity_id } => {
            sessions::stop_activity(&storage, &activity_id, &mut out).await
        }
        Commands::Status { watch: false } => sessions::print_status(&storage, &mut out).await,
        Commands::Status { watch: true } => {
            let shutdown = CancellationToken::new();
            tokio::spawn(detect_shutdown(shutdown.clone()));
            let result = sessions::watch_status(&storage, shutdown.clone(), &mut out).await;
            shutdown.cancel();
            result
        }
        Commands::Dashboard { scale } => {
            let now = storage.clock().local_time();
            dashboard::print_dashboard(&storage, scale, &now, locale, colored, &mut out).await
        }
        Commands::Filter { command } => process_filter_command(&storage, command, &mut out).await,
        Commands::Export { output } => {
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            profile::export(&storage, &output, &mut out).await
        }
        Commands::Clear { yes } => profile::clear(&storage, yes, &mut out).await,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Locale;
    use clap::Parser;

    use super::{output::bucketing::TimeScale, Args, Commands};

    #[test]
    fn dashboard_defaults_to_weekly() {
        let args = Args::parse_from(["stint", "dashboard"]);
        assert!(matches!(
            args.commands,
            Commands::Dashboard {
                scale: TimeScale::Weekly
            }
        ));
        assert_eq!(args.locale, Locale::en_US);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from([
            "stint",
            "dashboard",
            "--scale",
            "monthly",
            "--locale",
            "de_DE",
            "--dir",
            "/tmp/stint",
        ]);
        assert!(matches!(
            args.commands,
            Commands::Dashboard {
                scale: TimeScale::Monthly
            }
        ));
        assert_eq!(args.locale, Locale::de_DE);
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/stint")));
    }

    #[test]
    fn blank_activity_names_are_rejected() {
        assert!(Args::try_parse_from(["stint", "activity", "add", "  "]).is_err());
        assert!(Args::try_parse_from(["stint", "--locale", "xx_YY", "profile"]).is_err());
    }

    #[test]
    fn args_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
