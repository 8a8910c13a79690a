pub mod view;

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use view::{process_recent_command, process_tree_command, RecentCommand};

use crate::{
    conversation::{messenger::ConsoleMessenger, stdin::StdinService, InputLimits},
    session::{
        start_session, SessionConfig, SessionOptions, DEFAULT_MAX_DEFAULT_MINUTES,
        DEFAULT_MAX_RETRIES, DEFAULT_ROOT_OPTION, MAX_REMINDER_MINUTES,
    },
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir, LOG_DIR},
        logging::{enable_logging, COMMAND_PREFIX, SESSION_PREFIX},
    },
};

const DEFAULT_RESPONSE_WAIT_SECONDS: u64 = 60;
/// A year. Keeps the ceiling well inside what [chrono::Duration] can hold.
const MAX_DEFAULT_MINUTES_LIMIT: i64 = 365 * 24 * 60;

#[derive(Parser, Debug)]
#[command(name = "whatdoing", version, long_about = None)]
#[command(about = "Asks what you are doing and keeps a log of it", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Option<Commands>,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or \
                $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable verbose logging")]
    log: bool,
    #[arg(long, global = true, help = "Mirror logs to the console")]
    log_console: bool,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(clap::Args, Debug)]
struct SessionArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_RESPONSE_WAIT_SECONDS,
        help = "Seconds to wait for each answer"
    )]
    response_wait: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_RETRIES,
        help = "Retries allowed after an invalid answer"
    )]
    max_retries: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_DEFAULT_MINUTES,
        value_parser = clap::value_parser!(i64).range(0..=MAX_DEFAULT_MINUTES_LIMIT),
        help = "Longest time since the last record, in minutes, that a blank duration may \
                stand for"
    )]
    max_default_minutes: i64,
    #[arg(
        long,
        default_value_t = DEFAULT_ROOT_OPTION.to_owned(),
        help = "Option shown first at the top level"
    )]
    root_default: String,
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(0..=MAX_REMINDER_MINUTES),
        help = "Remind every given number of minutes, 0 disables reminders. Asked at startup \
                when missing"
    )]
    remind_every: Option<u64>,
    #[arg(long, help = "Program executed on every reminder, e.g. a notification script")]
    reminder_command: Option<PathBuf>,
}

impl SessionArgs {
    fn into_options(self, dir: PathBuf) -> SessionOptions {
        SessionOptions {
            dir,
            config: SessionConfig {
                input: InputLimits {
                    response_wait: Duration::from_secs(self.response_wait),
                    max_retries: self.max_retries,
                },
                max_default_elapsed: chrono::Duration::minutes(self.max_default_minutes),
                root_default: self.root_default,
            },
            remind_every: self.remind_every,
            reminder_command: self.reminder_command,
        }
    }
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start asking what you are doing. Used when no command is given")]
    Run,
    #[command(about = "Print the category tree")]
    Tree,
    #[command(about = "Print the latest recorded activities")]
    Recent {
        #[command(flatten)]
        command: RecentCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;
    let commands = args.commands.unwrap_or(Commands::Run);

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match commands {
        Commands::Run => SESSION_PREFIX,
        _ => COMMAND_PREFIX,
    };
    enable_logging(
        prefix,
        &ensure_dir(dir.join(LOG_DIR))?,
        logging_level,
        args.log_console,
    )?;

    match commands {
        Commands::Run => {
            start_session(
                args.session.into_options(dir),
                Box::new(StdinService::stdin()),
                Arc::new(ConsoleMessenger::new(io::stdout().is_terminal())),
                Arc::new(DefaultClock),
            )
            .await
        }
        Commands::Tree => process_tree_command(&dir).await,
        Commands::Recent { command } => process_recent_command(&dir, command).await,
    }
}
