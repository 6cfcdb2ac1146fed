//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a
//! clean interface for the main application logic. It supports the standard
//! help, version, and debug flags while gracefully handling unknown options.

use crate::prayer::PrayerName;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the notification daemon with these settings
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },

    /// Print today's full schedule and exit
    TimesCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Print the next prayer and the time remaining, then exit
    NextCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Flip one prayer's notification setting and exit
    ToggleCommand {
        debug_enabled: bool,
        prayer: PrayerName,
        config_dir: Option<String>,
    },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// Flags may appear before or after the subcommand. Unknown arguments
    /// produce `ShowHelpDueToError` rather than being silently ignored.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut command: Option<String> = None;
        let mut toggle_prayer: Option<PrayerName> = None;

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--config" | "-c" => {
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1; // Skip the parsed argument
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                _ if arg.starts_with('-') => {
                    log_warning!("Unknown option: {}", arg);
                    unknown_arg_found = true;
                }
                _ if command.is_none() => {
                    match arg {
                        "times" | "t" | "next" | "n" => command = Some(arg.to_string()),
                        "toggle" | "g" => {
                            command = Some("toggle".to_string());
                            // Parse: toggle <prayer>
                            if i + 1 < args_vec.len() {
                                match PrayerName::parse(&args_vec[i + 1]) {
                                    Some(prayer) => toggle_prayer = Some(prayer),
                                    None => {
                                        log_warning!("Unknown prayer: {}", args_vec[i + 1]);
                                        unknown_arg_found = true;
                                    }
                                }
                                i += 1; // Skip the parsed argument
                            } else {
                                log_warning!("Missing prayer for toggle. Usage: toggle <prayer>");
                                unknown_arg_found = true;
                            }
                        }
                        _ => {
                            log_warning!("Unknown command: {}", arg);
                            unknown_arg_found = true;
                        }
                    }
                }
                _ => {
                    log_warning!("Unexpected argument: {}", arg);
                    unknown_arg_found = true;
                }
            }
            i += 1;
        }

        // Determine the action based on parsed flags
        let action = if display_version {
            CliAction::ShowVersion
        } else if display_help || unknown_arg_found {
            if unknown_arg_found {
                CliAction::ShowHelpDueToError
            } else {
                CliAction::ShowHelp
            }
        } else {
            match command.as_deref() {
                Some("times") | Some("t") => CliAction::TimesCommand {
                    debug_enabled,
                    config_dir,
                },
                Some("next") | Some("n") => CliAction::NextCommand {
                    debug_enabled,
                    config_dir,
                },
                Some("toggle") => match toggle_prayer {
                    Some(prayer) => CliAction::ToggleCommand {
                        debug_enabled,
                        prayer,
                        config_dir,
                    },
                    None => CliAction::ShowHelpDueToError,
                },
                _ => CliAction::Run {
                    debug_enabled,
                    config_dir,
                },
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("athand [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("times, t               Print today's prayer schedule");
    log_indented!("next, n                Print the next prayer and time remaining");
    log_indented!("toggle, g <prayer>     Flip one prayer's notification on/off");
    log_indented!("                       (fajr, sunrise, dhuhr, asr, maghrib, isha)");
    log_end!();
}
