//! Command-line entry point: parse arguments and dispatch.

use anyhow::Result;
use std::sync::Arc;

use growlight::args::{CliAction, ParsedArgs};
use growlight::common::constants::EXIT_FAILURE;
use growlight::common::logger::Log;
use growlight::time::source::{self, RealTimeSource, SimulatedTimeSource};
use growlight::{Growlight, commands, config};
use growlight::{log_end, log_error_exit, log_indented, log_version};

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    if let Err(e) = dispatch(parsed.action) {
        log_error_exit!("{e:#}");
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
}

fn dispatch(action: CliAction) -> Result<()> {
    match action {
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
            simulate,
            stopped,
        } => {
            config::set_config_dir(config_dir)?;

            let _log_guard = match log_file {
                Some(path) => Some(Log::start_file_logging(path)?),
                None => None,
            };

            log_version!();
            let runner = Growlight::new(debug_enabled).start_stopped(stopped);
            match simulate {
                Some(sim) => {
                    source::init_time_source(Arc::new(SimulatedTimeSource::new(
                        sim.start,
                        sim.end,
                        sim.multiplier,
                    )));
                    log_indented!(
                        "Simulating {} to {}",
                        sim.start.format("%Y-%m-%d %H:%M:%S"),
                        sim.end.format("%Y-%m-%d %H:%M:%S")
                    );
                    runner.without_lock().run()
                }
                None => {
                    source::init_time_source(Arc::new(RealTimeSource));
                    runner.run()
                }
            }
        }
        CliAction::Control { command } => commands::control::handle_control_command(command),
        CliAction::Reload {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::reload::handle_reload_command(debug_enabled)
        }
        CliAction::Status { config_dir, json } => {
            config::set_config_dir(config_dir)?;
            if json {
                Log::set_enabled(false);
            }
            commands::status::handle_status_command(json)
        }
        CliAction::Summary { config_dir, since } => {
            config::set_config_dir(config_dir)?;
            commands::summary::handle_summary_command(since)
        }
        CliAction::Prune { before } => commands::summary::handle_prune_command(before),
        CliAction::ShowHelp => {
            commands::help::display_help();
            Ok(())
        }
        CliAction::ShowVersion => {
            println!("growlight {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            commands::help::display_help();
            std::process::exit(EXIT_FAILURE);
        }
    }
}
