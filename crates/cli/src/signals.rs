//! Ctrl+C / SIGTERM handling for a running migration.

use std::sync::atomic::Ordering;

use tracing::{info, warn};

use foldergit_core::observer::{cancel_flag, CancelFlag};

/// Create a cancel flag that is set on SIGINT (Ctrl+C) or SIGTERM.
///
/// The migration only checks the flag between folders, so the folder being
/// committed when the signal arrives still completes.
pub fn setup_cancel_handler() -> CancelFlag {
    let flag = cancel_flag();
    let flag_clone = flag.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to register SIGTERM handler");
                    if ctrl_c.await.is_err() {
                        return;
                    }
                    info!("received SIGINT (Ctrl+C), stopping after current folder");
                    flag_clone.store(true, Ordering::SeqCst);
                    return;
                }
            };

            tokio::select! {
                res = ctrl_c => {
                    if res.is_err() {
                        return;
                    }
                    info!("received SIGINT (Ctrl+C), stopping after current folder");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, stopping after current folder");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("received Ctrl+C, stopping after current folder");
        }

        flag_clone.store(true, Ordering::SeqCst);
    });

    flag
}
