//! Application orchestrator.
//! Loads/merges config, initializes logging, installs signal handlers, opens the trash
//! store and dispatches the subcommand. Maps outcomes to exit codes:
//! 0 when every item succeeded, 1 when some item failed, 2 on environment errors.

use anyhow::Result;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use trashctl::cli::{Args, Command, unquote_path};
use trashctl::output as out;
use trashctl::query::absolutize;
use trashctl::{
    CONFIG_ENV, Config, Expirer, ListOptions, Restorer, Selector, TrashError, TrashStore,
    default_config_path, load_config,
};

use crate::logging::init_tracing;

const EXIT_ITEM_FAILURES: u8 = 1;
const EXIT_ENVIRONMENT: u8 = 2;

/// Run the CLI application.
pub fn run(args: Args) -> ExitCode {
    // Handle --print-config before logging init
    if args.print_config {
        print_config(&args);
        return ExitCode::SUCCESS;
    }

    // Build config (may read XML). CLI args override config values.
    let mut cfg = match load_config() {
        Ok((cfg, source)) => {
            if let Some(path) = source {
                debug!(path = %path.display(), "config file in use");
            }
            cfg
        }
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            return ExitCode::from(EXIT_ENVIRONMENT);
        }
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = match init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json_logs) {
        Ok(g) => g,
        Err(e) => {
            out::print_error(&format!("Failed to initialize logging: {e}"));
            return ExitCode::from(EXIT_ENVIRONMENT);
        }
    };

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        let installed = ctrlc::set_handler(move || {
            trashctl::shutdown::request();
            out::print_warn("Received interrupt; finishing the current item...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        });
        if let Err(e) = installed {
            warn!(error = %e, "could not install interrupt handler");
        }
    }

    debug!("Starting trashctl: {:?}", args);

    let code = match args.command.as_ref() {
        Some(command) => match execute(command, cfg) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::from(EXIT_ITEM_FAILURES),
            Err(e) => {
                report_fatal(&e);
                ExitCode::from(EXIT_ENVIRONMENT)
            }
        },
        None => {
            out::print_error("no command given; see --help");
            ExitCode::from(EXIT_ENVIRONMENT)
        }
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    code
}

/// Dispatch one subcommand. `Ok(false)` means some item failed.
fn execute(command: &Command, cfg: Config) -> Result<bool> {
    let store = TrashStore::open(cfg)?;
    match command {
        Command::Put { paths } => {
            let sources: Vec<_> = paths.iter().map(|p| unquote_path(p)).collect();
            let report = store.trash_all(&sources)?;
            for item in &report.succeeded {
                let origin = item
                    .original_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                out::print_success(&format!("trashed '{origin}' as {}", item.trash_name()));
            }
            out::print_failures(&report.failures);
            Ok(report.is_success())
        }
        Command::List {
            filter,
            size,
            by_time,
            json,
        } => {
            let filter = filter.to_filter()?;
            let options = ListOptions {
                by_time: *by_time,
                with_sizes: *size,
            };
            let items = store.list(&filter, options)?;
            if *json {
                out::print_list_json(items, *size)?;
            } else {
                let count = out::print_list(items, *size);
                debug!(count, "listed items");
            }
            Ok(true)
        }
        Command::Restore { selectors, to, .. } => {
            let Some(opts) = command.restore_options() else {
                return Ok(true);
            };
            let selectors: Vec<Selector> = selectors.iter().map(|s| Selector::parse(s)).collect();
            let into_dir = to.as_deref().map(|d| absolutize(&unquote_path(d))).transpose()?;
            let report = Restorer::new(&store).restore_all(&selectors, into_dir.as_deref(), &opts)?;
            for r in &report.succeeded {
                out::print_success(&format!("restored {} -> {}", r.trash_name, r.destination.display()));
            }
            out::print_failures(&report.failures);
            Ok(report.is_success())
        }
        Command::Empty { filter } => {
            if filter.is_empty() {
                info!(root = %store.root().display(), "Emptying the whole trash");
            }
            let report = Expirer::new(&store).empty(&filter.to_filter()?)?;
            out::print_purge("deleted", &report);
            out::print_failures(&report.failures);
            Ok(report.is_success())
        }
        Command::Expire { when } => {
            let report = Expirer::new(&store).expire(*when)?;
            out::print_purge("expired", &report);
            out::print_failures(&report.failures);
            Ok(report.is_success())
        }
        Command::Orphans { filter, .. } => {
            let report = Expirer::new(&store).orphans(&filter.to_filter()?, command.reconcile())?;
            out::print_orphans(&report);
            out::print_failures(&report.outcome.failures);
            Ok(report.outcome.is_success())
        }
    }
}

/// Log and print an error that aborted the run.
fn report_fatal(e: &anyhow::Error) {
    if let Some(te) = e.downcast_ref::<TrashError>() {
        error!(code = te.code(), kind = te.kind(), error = %te, "Run aborted");
    } else {
        error!(error = ?e, "Run aborted");
    }
    out::print_error(&format!("{e:#}"));
}

fn print_config(args: &Args) {
    match std::env::var_os(CONFIG_ENV) {
        Some(p) => out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}",
            p.to_string_lossy()
        )),
        None => match default_config_path() {
            Some(p) => {
                out::print_info(&format!("Default trashctl config path:\n  {}", p.display()));
                if !p.exists() {
                    out::print_info("No config file exists there yet; built-in defaults apply.");
                }
            }
            None => out::print_error("Could not determine a default config path"),
        },
    }
    match load_config() {
        Ok((mut cfg, _)) => {
            args.apply_overrides(&mut cfg);
            out::print_info(&format!("Trash root:\n  {}", cfg.trash_root.display()));
        }
        Err(e) => out::print_error(&format!("{e:#}")),
    }
}
