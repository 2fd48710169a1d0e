use std::{collections::BTreeMap, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

type Action = Box<dyn FnOnce() -> BoxFuture<'static, crate::Result<()>> + Send>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceManagerError {
    #[error("installing {key} failed: {message}")]
    InstallFailed { key: String, message: String },
    #[error("installation of {0} stopped before completing")]
    InstallAborted(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Installing,
    Installed,
    Failed(String),
    TearingDown,
    Removed,
}

struct Entry {
    ref_count: usize,
    phase: Arc<watch::Sender<Phase>>,
    uninstaller: Option<Action>,
}

/// Proof that a shared resource is installed. Hand it back with [`ResourceManager::release`].
#[derive(Debug)]
#[must_use]
pub struct ResourceHandle {
    key: String,
}

impl ResourceHandle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Reference counted installs of shared resources, e.g. CRDs or fixtures used by several tests.
///
/// The first `acquire` of a key starts the installer in the background and every concurrent `acquire`
/// of the same key waits for it. The uninstaller runs once the last handle is released. An `acquire`
/// that arrives during a teardown waits for it and installs again. The mutex only guards the bookkeeping.
#[derive(Clone, Default)]
pub struct ResourceManager {
    entries: Arc<Mutex<BTreeMap<String, Entry>>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire<I, IF, U, UF>(&self, key: &str, installer: I, uninstaller: U) -> Result<ResourceHandle, ResourceManagerError>
    where
        I: FnOnce() -> IF + Send + 'static,
        IF: Future<Output = crate::Result<()>> + Send + 'static,
        U: FnOnce() -> UF + Send + 'static,
        UF: Future<Output = crate::Result<()>> + Send + 'static,
    {
        let mut installer: Option<Action> = Some(Box::new(move || installer().boxed()));
        let mut uninstaller: Option<Action> = Some(Box::new(move || uninstaller().boxed()));

        loop {
            let (mut receiver, tearing_down) = {
                let mut entries = self.entries.lock().await;
                match entries.get_mut(key) {
                    Some(entry) => {
                        let tearing_down = *entry.phase.borrow() == Phase::TearingDown;
                        if !tearing_down {
                            entry.ref_count += 1;
                        }
                        (entry.phase.subscribe(), tearing_down)
                    },
                    None => {
                        let (sender, receiver) = watch::channel(Phase::Installing);
                        let sender = Arc::new(sender);
                        entries.insert(key.to_owned(), Entry { ref_count: 1, phase: Arc::clone(&sender), uninstaller: uninstaller.take() });
                        match installer.take() {
                            Some(installer) => spawn_install(key.to_owned(), installer, sender),
                            None => {
                                sender.send_replace(Phase::Failed("installer already consumed".to_owned()));
                            },
                        }
                        (receiver, false)
                    },
                }
            };

            if tearing_down {
                debug!("Waiting for teardown of {key}");
                let _ = receiver.wait_for(|phase| *phase != Phase::TearingDown).await;
                continue;
            }

            let phase = receiver.wait_for(|phase| *phase != Phase::Installing).await.map(|phase| (*phase).clone());
            return match phase {
                Ok(Phase::Installed) => Ok(ResourceHandle { key: key.to_owned() }),
                Ok(Phase::Failed(message)) => {
                    self.forget(key).await;
                    Err(ResourceManagerError::InstallFailed { key: key.to_owned(), message })
                },
                _ => {
                    self.forget(key).await;
                    Err(ResourceManagerError::InstallAborted(key.to_owned()))
                },
            };
        }
    }

    pub async fn release(&self, handle: ResourceHandle) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&handle.key) else {
            warn!("Releasing {} which is not installed", handle.key);
            return;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            debug!("Released {} still used {} times", handle.key, entry.ref_count);
            return;
        }

        entry.phase.send_replace(Phase::TearingDown);
        let uninstaller = entry.uninstaller.take();
        let entries = Arc::clone(&self.entries);
        let key = handle.key;
        tokio::spawn(async move {
            if let Some(uninstaller) = uninstaller {
                match tokio::spawn(uninstaller()).await {
                    Ok(Ok(())) => info!("Uninstalled {key}"),
                    Ok(Err(e)) => warn!("Uninstalling {key} failed {e}"),
                    Err(e) => warn!("Uninstalling {key} did not complete {e}"),
                }
            }
            if let Some(entry) = entries.lock().await.remove(&key) {
                entry.phase.send_replace(Phase::Removed);
            }
        });
    }

    /// A failed install keeps no resource. The last waiter removes the entry so the next acquire retries.
    async fn forget(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.ref_count = entry.ref_count.saturating_sub(1);
            if entry.ref_count == 0 {
                entries.remove(key);
            }
        }
    }
}

fn spawn_install(key: String, installer: Action, phase: Arc<watch::Sender<Phase>>) {
    tokio::spawn(async move {
        let outcome = match tokio::spawn(installer()).await {
            Ok(Ok(())) => {
                info!("Installed {key}");
                Phase::Installed
            },
            Ok(Err(e)) => {
                warn!("Installing {key} failed {e}");
                Phase::Failed(e.to_string())
            },
            Err(e) => {
                warn!("Installing {key} did not complete {e}");
                Phase::Failed(e.to_string())
            },
        };
        phase.send_replace(outcome);
    });
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    use super::*;

    const KEY: &str = "gateway-api-crds";

    async fn install(installs: Arc<AtomicUsize>, delay: Duration) -> crate::Result<()> {
        sleep(delay).await;
        installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn uninstall(uninstalls: Arc<AtomicUsize>, delay: Duration) -> crate::Result<()> {
        sleep(delay).await;
        uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fail(attempts: Arc<AtomicUsize>) -> crate::Result<()> {
        sleep(Duration::from_millis(20)).await;
        attempts.fetch_add(1, Ordering::SeqCst);
        Err("crd rejected".into())
    }

    async fn acquire_counting(
        manager: &ResourceManager,
        installs: &Arc<AtomicUsize>,
        uninstalls: &Arc<AtomicUsize>,
    ) -> Result<ResourceHandle, ResourceManagerError> {
        let installs = Arc::clone(installs);
        let uninstalls = Arc::clone(uninstalls);
        manager
            .acquire(KEY, move || install(installs, Duration::from_millis(20)), move || uninstall(uninstalls, Duration::from_millis(20)))
            .await
    }

    #[tokio::test]
    pub async fn test_concurrent_acquires_install_once() {
        let manager = ResourceManager::new();
        let installs = Arc::new(AtomicUsize::new(0));
        let uninstalls = Arc::new(AtomicUsize::new(0));

        let handles = join_all((0..8).map(|_| acquire_counting(&manager, &installs, &uninstalls))).await;
        assert!(handles.iter().all(Result::is_ok));
        assert_eq!(installs.load(Ordering::SeqCst), 1);
        assert_eq!(handles[0].as_ref().map(ResourceHandle::key).ok(), Some(KEY));
    }

    #[tokio::test]
    pub async fn test_teardown_when_last_handle_released() {
        let manager = ResourceManager::new();
        let installs = Arc::new(AtomicUsize::new(0));
        let uninstalls = Arc::new(AtomicUsize::new(0));

        let first = acquire_counting(&manager, &installs, &uninstalls).await.unwrap();
        let second = acquire_counting(&manager, &installs, &uninstalls).await.unwrap();
        assert_eq!(installs.load(Ordering::SeqCst), 1);

        manager.release(first).await;
        sleep(Duration::from_millis(60)).await;
        assert_eq!(uninstalls.load(Ordering::SeqCst), 0);

        manager.release(second).await;
        sleep(Duration::from_millis(60)).await;
        assert_eq!(uninstalls.load(Ordering::SeqCst), 1);
        assert!(manager.entries.lock().await.is_empty());
    }

    #[tokio::test]
    pub async fn test_install_error_reaches_every_waiter() {
        let manager = ResourceManager::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let uninstalls = Arc::new(AtomicUsize::new(0));

        let results = join_all((0..4).map(|_| {
            let attempts = Arc::clone(&attempts);
            let uninstalls = Arc::clone(&uninstalls);
            manager.acquire(KEY, move || fail(attempts), move || uninstall(uninstalls, Duration::ZERO))
        }))
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap_err(), ResourceManagerError::InstallFailed { key: KEY.to_owned(), message: "crd rejected".to_owned() });
        }
        assert!(manager.entries.lock().await.is_empty());
        assert_eq!(uninstalls.load(Ordering::SeqCst), 0);

        let installs = Arc::new(AtomicUsize::new(0));
        assert!(acquire_counting(&manager, &installs, &uninstalls).await.is_ok());
        assert_eq!(installs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    pub async fn test_acquire_during_teardown_reinstalls() {
        let manager = ResourceManager::new();
        let installs = Arc::new(AtomicUsize::new(0));
        let uninstalls = Arc::new(AtomicUsize::new(0));
        let torn_down = Arc::new(AtomicBool::new(false));

        let handle = {
            let installs = Arc::clone(&installs);
            let torn_down = Arc::clone(&torn_down);
            manager
                .acquire(KEY, move || install(installs, Duration::ZERO), move || async move {
                    sleep(Duration::from_millis(50)).await;
                    torn_down.store(true, Ordering::SeqCst);
                    Ok::<(), crate::Error>(())
                })
                .await
                .unwrap()
        };

        manager.release(handle).await;

        let installed_after_teardown = Arc::new(AtomicBool::new(false));
        let observed = Arc::clone(&installed_after_teardown);
        let torn_down_seen = Arc::clone(&torn_down);
        let reinstalls = Arc::clone(&installs);
        let uninstall_count = Arc::clone(&uninstalls);
        let handle = manager
            .acquire(
                KEY,
                move || async move {
                    observed.store(torn_down_seen.load(Ordering::SeqCst), Ordering::SeqCst);
                    install(reinstalls, Duration::ZERO).await
                },
                move || uninstall(uninstall_count, Duration::ZERO),
            )
            .await;

        assert!(handle.is_ok());
        assert!(installed_after_teardown.load(Ordering::SeqCst));
        assert_eq!(installs.load(Ordering::SeqCst), 2);
    }
}
