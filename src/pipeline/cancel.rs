//! Session cancellation: Ctrl+C or `q` + Enter on the terminal.

use std::io::{BufRead, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop request, checked by the orchestrator once per raw frame.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancel when the process receives Ctrl+C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("interrupt received, stopping after current frame");
                    flag.cancel();
                }
                Err(e) => tracing::warn!("Failed to wait for Ctrl+C: {}", e),
            }
        });
    }

    /// Cancel when a line consisting of `q` is typed on an interactive stdin.
    ///
    /// Runs on a detached thread so a pending read never blocks shutdown.
    pub fn watch_quit_key(&self) {
        if !std::io::stdin().is_terminal() {
            return;
        }
        let flag = self.clone();
        let spawned = std::thread::Builder::new()
            .name("quit-key".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if is_quit_command(&line) {
                        flag.cancel();
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to start quit-key watcher: {}", e);
        }
    }
}

fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear() {
        assert!(!CancelFlag::new().is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn quit_command_matching() {
        assert!(is_quit_command("q"));
        assert!(is_quit_command(" Q \n"));
        assert!(!is_quit_command("quit now"));
        assert!(!is_quit_command(""));
    }

    #[tokio::test]
    async fn ctrl_c_watcher_does_not_cancel_by_itself() {
        let flag = CancelFlag::new();
        flag.watch_ctrl_c();
        tokio::task::yield_now().await;
        assert!(!flag.is_cancelled());
    }
}
