//! SIGINT/SIGTERM cancellation: one `Arc<AtomicBool>` registered
//! against both signals via `signal-hook`, checked at batch boundaries by
//! the indexer/updater loops. Raising the flag never kills the process
//! directly — the running batch finishes observing it, its transaction is
//! dropped unc­ommitted, and the command boundary reports "interrupted,
//! partial progress saved" with exit code 1.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

use crate::error::CliError;

/// Registers the cancel flag against both signals. Fails only if the
/// underlying `sigaction` registration itself fails (spec: treated as a
/// fatal setup error, not a recoverable one).
pub fn install() -> Result<Arc<AtomicBool>, CliError> {
    let cancel = Arc::new(AtomicBool::new(false));
    flag::register(SIGINT, Arc::clone(&cancel))
        .map_err(|e| CliError::Other(format!("failed to register SIGINT handler: {e}")))?;
    flag::register(SIGTERM, Arc::clone(&cancel))
        .map_err(|e| CliError::Other(format!("failed to register SIGTERM handler: {e}")))?;
    Ok(cancel)
}
