mod app;
mod calendar;
mod config;
mod dates;
mod form;
mod gate;
mod help;
mod leg;
mod logging;
mod manager;
mod store;
mod theme;
mod timeline;
use crate::app::App;
use crate::calendar::MonthCursor;
use crate::config::Config;
use crate::gate::PasscodeGate;
use crate::manager::LegManager;
use crate::store::MemoryStore;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use time::OffsetDateTime;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run {
        app_id: Option<String>,
        log_file: Option<PathBuf>,
        month: Option<MonthCursor>,
    },
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut app_id = None;
        let mut log_file = None;
        let mut month = None;
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Short('a') | Arg::Long("app-id") => app_id = Some(parser.value()?.string()?),
                Arg::Long("log-file") => log_file = Some(PathBuf::from(parser.value()?)),
                Arg::Value(value) if month.is_none() => month = Some(value.parse()?),
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run {
            app_id,
            log_file,
            month,
        })
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run {
                app_id,
                log_file,
                month,
            } => {
                let today = OffsetDateTime::now_local()
                    .context("failed to determine local date")?
                    .date();
                let mut config = Config::from_env().context("failed to read configuration")?;
                if let Some(app_id) = app_id {
                    config.app_id = app_id;
                }
                if log_file.is_some() {
                    config.log_file = log_file;
                }
                logging::init(config.log_file.as_deref())?;
                tracing::debug!(?config, "Loaded configuration");
                let store = MemoryStore::connect(&config.backend)
                    .context("failed to initialize leg store")?;
                tracing::info!(
                    project_id = store.project_id(),
                    app_id = %config.app_id,
                    "Starting sailplan"
                );
                let Config {
                    app_id,
                    auth_token,
                    passcode,
                    ..
                } = config;
                let manager = LegManager::new(&store, app_id, PasscodeGate::new(passcode));
                let mut app = App::new(manager, today);
                if let Some(cursor) = month {
                    app = app.start_month(cursor);
                }
                app.connect(auth_token.as_deref());
                with_terminal(|mut terminal| {
                    terminal.hide_cursor().context("failed to hide cursor")?;
                    app.run(&mut terminal)?;
                    Ok(())
                })?;
                tracing::info!("Exiting");
                Ok(())
            }
            Command::Help => {
                println!("Usage: sailplan [<options>] [YYYY-MM]");
                println!();
                println!("Plan sailing legs on a month calendar");
                println!();
                println!("Options:");
                println!("  -a, --app-id <ID>   Keep legs under this application ID");
                println!("      --log-file <PATH>");
                println!("                      Append log messages to the given file");
                println!("  -h, --help          Display this help message and exit");
                println!("  -V, --version       Show the program version and exit");
                println!();
                println!("Environment:");
                println!("  SAILPLAN_APP_ID, SAILPLAN_BACKEND_CONFIG, SAILPLAN_AUTH_TOKEN,");
                println!("  SAILPLAN_PASSCODE, SAILPLAN_LOG_FILE, RUST_LOG");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}
