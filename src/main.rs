//! Main application entry point and high-level flow coordination.
//!
//! This module stays intentionally thin: it parses the command line and
//! dispatches to the daemon runner or one of the one-shot command handlers.
//! All application logic lives in the library crate.

use anyhow::Result;

use athand::args::{self, CliAction, ParsedArgs};
use athand::{Athand, commands, config};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    // Apply --config before anything touches the config directory
    let config_dir = match &parsed_args.action {
        CliAction::Run { config_dir, .. }
        | CliAction::TimesCommand { config_dir, .. }
        | CliAction::NextCommand { config_dir, .. }
        | CliAction::ToggleCommand { config_dir, .. } => config_dir.clone(),
        _ => None,
    };
    if let Some(dir) = config_dir {
        config::set_config_dir(&dir)?;
    }

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(1);
        }
        CliAction::Run { debug_enabled, .. } => Athand::new(debug_enabled).run(),
        CliAction::TimesCommand { debug_enabled, .. } => {
            commands::times::handle_times_command(debug_enabled)
        }
        CliAction::NextCommand { debug_enabled, .. } => {
            commands::next::handle_next_command(debug_enabled)
        }
        CliAction::ToggleCommand {
            prayer,
            debug_enabled,
            ..
        } => commands::toggle::handle_toggle_command(prayer, debug_enabled),
    }
}
