//! Lock file management for single-instance enforcement.
//!
//! Only one athand daemon should run per session, otherwise every prayer
//! would notify twice. A lock file in the runtime directory holds an
//! exclusive fs2 lock plus the owner's PID so stale locks from crashed
//! processes can be cleaned up.

use anyhow::Result;
use fs2::FileExt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::config::Config;

/// Acquire an exclusive lock on the lock file.
///
/// The lock file contains:
/// - Process ID (PID)
/// - Config directory (empty line if using default)
///
/// # Returns
/// - `Ok((lock_file, lock_path))` if the lock was acquired
/// - `Err(_)` if an error occurred that requires termination
/// - Never returns if another instance is running (calls std::process::exit)
pub fn acquire_lock() -> Result<(File, String)> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    let lock_path = format!("{runtime_dir}/athand.lock");

    // Open without truncating to preserve content for conflict inspection
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            write_lock_contents(lock_file, &lock_path)
        }
        Err(_) => {
            // Another instance may be running; resolve stale locks or exit
            handle_lock_conflict(&lock_path)?;

            let retry_lock_file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;

            match retry_lock_file.try_lock_exclusive() {
                Ok(()) => write_lock_contents(retry_lock_file, &lock_path),
                Err(e) => {
                    log_error_exit!("Failed to acquire lock after cleanup attempt: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn write_lock_contents(mut lock_file: File, lock_path: &str) -> Result<(File, String)> {
    lock_file.set_len(0)?;
    lock_file.seek(SeekFrom::Start(0))?;

    writeln!(&lock_file, "{}", std::process::id())?;
    match Config::config_dir() {
        Ok(dir) => writeln!(&lock_file, "{}", dir.display())?,
        Err(_) => writeln!(&lock_file)?,
    }
    lock_file.flush()?;

    Ok((lock_file, lock_path.to_string()))
}

/// Handle lock file conflicts.
///
/// # Returns
/// - `Ok(())` if the conflict was resolved (stale or invalid lock removed)
/// - Never returns if another instance is running (calls std::process::exit)
fn handle_lock_conflict(lock_path: &str) -> Result<()> {
    let lock_content = match std::fs::read_to_string(lock_path) {
        Ok(content) => content,
        Err(_) => {
            // Lock file doesn't exist or can't be read - assume it was cleaned up
            return Ok(());
        }
    };

    // Lock file format: PID (line 1), config_dir (line 2, optional)
    let pid = match lock_content.lines().next().map(str::trim) {
        Some(line) => match line.parse::<u32>() {
            Ok(pid) => pid,
            Err(_) => {
                log_warning!("Lock file contains invalid PID, removing stale lock");
                let _ = std::fs::remove_file(lock_path);
                return Ok(());
            }
        },
        None => {
            log_warning!("Lock file is empty, removing");
            let _ = std::fs::remove_file(lock_path);
            return Ok(());
        }
    };

    if !is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(lock_path);
        return Ok(());
    }

    log_pipe!();
    log_error!("athand is already running (PID: {pid})");
    log_block_start!("Did you mean to:");
    log_indented!("• Reload settings: kill -USR2 {pid}");
    log_indented!("• View today's schedule: athand times");
    log_indented!("• Toggle a notification: athand toggle <prayer>");
    log_block_start!("Cannot start - another athand instance is running");
    log_end!();
    std::process::exit(1)
}

fn is_process_running(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}
