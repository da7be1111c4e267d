use std::{env, io::Write, path::PathBuf, sync::PoisonError, time::Duration};

use clap::Parser;
use cli::{Args, Commands};
use commands::Session;
use error::CliResult;
use logging::setup_logging;
use recordkit_config::config::{self, get_config};
use recordkit_db::SqliteRepository;
use tracing::debug;
use utils::COLOR;

mod cli;
mod commands;
mod error;
mod filters;
mod logging;
mod utils;

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args)?;

    if args.no_color {
        let mut color = COLOR.write().unwrap_or_else(PoisonError::into_inner);
        *color = false;
    }

    if let Some(ref c) = args.config {
        let path = PathBuf::from(c);
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()?.join(path)
        };
        config::set_config_path(path);
    }

    config::init()?;
    let config = get_config();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Commands::Config = args.command {
        write!(out, "{}", config.to_toml()?)?;
        return Ok(());
    }

    let db_path = match args.db {
        Some(ref db) => PathBuf::from(db),
        None => config.get_database_path()?,
    };
    debug!("using database {}", db_path.display());

    let repo = SqliteRepository::open_existing(
        &db_path,
        Duration::from_millis(config.get_busy_timeout_ms()),
    )?;

    Session::new(repo, config).run(args.command, &mut out)?;
    out.flush()?;

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
