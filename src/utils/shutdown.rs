//! Graceful shutdown utilities for proxy-catalog: lets the scheduler loop and the
//! API listener drain before the process exits on Ctrl+C or SIGTERM.

use std::collections::HashSet;
use std::sync::Arc;

use log::{error, info};
use once_cell::sync::Lazy;
use tokio::sync::{broadcast, mpsc, RwLock};

#[derive(Debug, Clone)]
pub enum ShutdownReason {
    UserInterrupt,
}

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    active_tasks: Arc<RwLock<HashSet<String>>>,
}

impl ShutdownManager {
    fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            active_tasks: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    async fn register_task(&self, task_name: String) -> mpsc::Receiver<ShutdownReason> {
        let (tx, rx) = mpsc::channel(1);
        self.active_tasks.write().await.insert(task_name.clone());

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let active_tasks = self.active_tasks.clone();
        tokio::spawn(async move {
            if let Ok(reason) = shutdown_rx.recv().await {
                let _ = tx.send(reason).await;
                active_tasks.write().await.remove(&task_name);
            }
        });

        rx
    }

    fn shutdown(&self, reason: ShutdownReason) {
        info!("initiating shutdown: {:?}", reason);
        let _ = self.shutdown_tx.send(reason);
    }
}

static SHUTDOWN_MANAGER: Lazy<ShutdownManager> = Lazy::new(ShutdownManager::new);

pub fn init_shutdown_manager() {
    Lazy::force(&SHUTDOWN_MANAGER);
}

/// Register the caller for a shutdown notification; drop the returned receiver
/// to stop listening.
pub async fn register_for_shutdown(task_name: String) -> mpsc::Receiver<ShutdownReason> {
    SHUTDOWN_MANAGER.register_task(task_name).await
}

/// Waits for Ctrl+C or (on Unix) SIGTERM, then broadcasts a shutdown reason to
/// every registered receiver.
pub async fn setup_signal_handlers() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                error!("failed to install sigterm handler: {}", e);
                return;
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("failed to listen for ctrl-c: {}", e);
                    return;
                }
                info!("ctrl-c received, shutting down");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("ctrl-c received, shutting down");
    }

    SHUTDOWN_MANAGER.shutdown(ShutdownReason::UserInterrupt);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_task_receives_broadcast_reason() {
        let manager = ShutdownManager::new();
        let mut rx = manager.register_task("test".to_string()).await;
        manager.shutdown(ShutdownReason::UserInterrupt);
        let reason = rx.recv().await.unwrap();
        assert!(matches!(reason, ShutdownReason::UserInterrupt));
    }

    #[tokio::test]
    async fn unregistered_shutdown_does_not_panic() {
        let manager = ShutdownManager::new();
        manager.shutdown(ShutdownReason::UserInterrupt);
    }
}
