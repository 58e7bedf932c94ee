//! Command-line argument parsing.
//!
//! With no subcommand `growlight` runs the controller. Subcommands talk to a
//! running instance (`start`, `stop`, `auto`, `manual`, `led on|off`,
//! `reload`) or read local state (`status`, `summary`, `prune`).

use chrono::{NaiveDate, NaiveDateTime};

use crate::io::control::ControlCommand;

/// Simulated clock requested with `--simulate`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateArgs {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// 0 runs as fast as possible.
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Run the controller.
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
        simulate: Option<SimulateArgs>,
        /// Stay idle until a `start` command arrives.
        stopped: bool,
    },
    /// Forward an operator command to the running controller.
    Control { command: ControlCommand },
    Reload {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    Status {
        config_dir: Option<String>,
        json: bool,
    },
    Summary {
        config_dir: Option<String>,
        since: Option<NaiveDate>,
    },
    Prune { before: NaiveDate },
    ShowHelp,
    ShowVersion,
    ShowHelpDueToError,
}

pub struct ParsedArgs {
    pub action: CliAction,
}

fn usage_error(message: &str) -> ParsedArgs {
    log_warning!("{}", message);
    ParsedArgs {
        action: CliAction::ShowHelpDueToError,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

impl ParsedArgs {
    /// Parse `args` (including the program name in position 0).
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut simulate: Option<SimulateArgs> = None;
        let mut stopped = false;
        let mut json = false;
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--help" | "-h" => {
                    return ParsedArgs {
                        action: CliAction::ShowHelp,
                    };
                }
                "--version" | "-V" | "-v" => {
                    return ParsedArgs {
                        action: CliAction::ShowVersion,
                    };
                }
                "--debug" | "-d" => debug_enabled = true,
                "--stopped" => stopped = true,
                "--json" => json = true,
                "--config" | "-c" => match args_vec.get(i + 1) {
                    Some(dir) if !dir.starts_with('-') => {
                        config_dir = Some(dir.clone());
                        i += 1;
                    }
                    _ => {
                        return usage_error(
                            "Missing directory for --config. Usage: --config <directory>",
                        );
                    }
                },
                "--log" | "-l" => match args_vec.get(i + 1) {
                    Some(file) if !file.starts_with('-') => {
                        log_file = Some(file.clone());
                        i += 1;
                    }
                    _ => return usage_error("Missing file for --log. Usage: --log <file>"),
                },
                "--simulate" | "-S" => {
                    let (Some(start), Some(end)) = (args_vec.get(i + 1), args_vec.get(i + 2))
                    else {
                        return usage_error(
                            "Usage: --simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier]",
                        );
                    };
                    let (start, end) = match (
                        crate::time::source::parse_datetime(start),
                        crate::time::source::parse_datetime(end),
                    ) {
                        (Ok(start), Ok(end)) => (start, end),
                        (Err(e), _) | (_, Err(e)) => {
                            return usage_error(&format!("Invalid --simulate time: {e}"));
                        }
                    };
                    if end <= start {
                        return usage_error("--simulate end time must be after the start time");
                    }
                    i += 2;

                    let mut multiplier = 0.0;
                    if let Some(next) = args_vec.get(i + 1)
                        && let Ok(value) = next.parse::<f64>()
                    {
                        if value < 0.0 {
                            return usage_error("--simulate multiplier must not be negative");
                        }
                        multiplier = value;
                        i += 1;
                    }

                    simulate = Some(SimulateArgs {
                        start,
                        end,
                        multiplier,
                    });
                }
                _ if arg.starts_with('-') => {
                    return usage_error(&format!("Unknown option: {arg}"));
                }
                _ => positional.push(arg.to_string()),
            }
            i += 1;
        }

        let words: Vec<&str> = positional.iter().map(String::as_str).collect();
        let action = match words.as_slice() {
            [] => CliAction::Run {
                debug_enabled,
                config_dir,
                log_file,
                simulate,
                stopped,
            },
            ["help"] => CliAction::ShowHelp,
            ["start"] | ["stop"] | ["auto"] | ["manual"] | ["led", "on"] | ["led", "off"] => {
                match words.join(" ").parse::<ControlCommand>() {
                    Ok(command) => CliAction::Control { command },
                    Err(e) => return usage_error(&e.to_string()),
                }
            }
            ["led", ..] => return usage_error("Usage: growlight led on|off"),
            ["reload"] => CliAction::Reload {
                debug_enabled,
                config_dir,
            },
            ["status"] => CliAction::Status { config_dir, json },
            ["summary"] => CliAction::Summary {
                config_dir,
                since: None,
            },
            ["summary", since] => match parse_date(since) {
                Some(since) => CliAction::Summary {
                    config_dir,
                    since: Some(since),
                },
                None => return usage_error("Usage: growlight summary [YYYY-MM-DD]"),
            },
            ["prune", before] => match parse_date(before) {
                Some(before) => CliAction::Prune { before },
                None => return usage_error("Usage: growlight prune <YYYY-MM-DD>"),
            },
            ["prune"] => return usage_error("Usage: growlight prune <YYYY-MM-DD>"),
            [command, ..] => return usage_error(&format!("Unknown command: {command}")),
        };

        ParsedArgs { action }
    }
}
