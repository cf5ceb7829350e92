//! Fan-in of concurrent child syncs
//!
//! A [`PendingGroup`] counts the outstanding work of one folder sync and
//! collects the failures of its children. It starts with one unit standing for
//! the folder itself; every child adds a unit through [`PendingGroup::register`]
//! before it is spawned. The group resolves its [`PendingOutcome`] exactly once,
//! when the last unit is released.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{error, trace};

use crate::domain::newtypes::NodePath;
use crate::domain::{SyncError, SyncFailures};

type Outcome = Result<NodePath, SyncFailures>;

struct Inner {
    owner: NodePath,
    remaining: AtomicUsize,
    errors: Mutex<BTreeMap<NodePath, SyncError>>,
    resolve: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Inner {
    fn errors(&self) -> MutexGuard<'_, BTreeMap<NodePath, SyncError>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.errors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, path: &NodePath, failures: impl IntoIterator<Item = (NodePath, SyncError)>) {
        let mut failures = failures.into_iter().peekable();
        if failures.peek().is_some() {
            self.errors().extend(failures);
        }

        let previous = match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous,
            Err(_) => {
                error!(owner = %self.owner, %path, "completion reported after the group resolved");
                return;
            }
        };
        trace!(owner = %self.owner, %path, remaining = previous - 1, "unit released");

        if previous == 1 {
            self.resolve();
        }
    }

    fn resolve(&self) {
        let errors = std::mem::take(&mut *self.errors());
        let outcome = if errors.is_empty() {
            Ok(self.owner.clone())
        } else {
            Err(errors.into_iter().collect())
        };

        let sender = self
            .resolve
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(sender) => {
                // The waiter may have been dropped; nobody is left to notify then.
                let _ = sender.send(outcome);
            }
            None => error!(owner = %self.owner, "group resolved twice"),
        }
    }
}

/// Completion tracker shared by one folder sync and its children
#[derive(Clone)]
pub struct PendingGroup {
    inner: Arc<Inner>,
}

impl PendingGroup {
    /// Creates a group owned by `owner` with one outstanding unit
    pub fn new(owner: NodePath) -> (Self, PendingOutcome) {
        let (sender, receiver) = oneshot::channel();
        let group = Self {
            inner: Arc::new(Inner {
                owner: owner.clone(),
                remaining: AtomicUsize::new(1),
                errors: Mutex::new(BTreeMap::new()),
                resolve: Mutex::new(Some(sender)),
            }),
        };
        (group, PendingOutcome { owner, receiver })
    }

    /// Number of units not yet released
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Adds one outstanding unit for the child mirrored to `path`
    ///
    /// Must be called before the child is spawned.
    #[must_use = "dropping a registration reports the child as interrupted"]
    pub fn register(&self, path: NodePath) -> Registration {
        self.inner.remaining.fetch_add(1, Ordering::AcqRel);
        Registration {
            group: Some(Arc::clone(&self.inner)),
            path,
        }
    }

    /// Releases one unit, recording `error` under `path` when present
    pub fn complete(&self, path: &NodePath, error: Option<SyncError>) {
        self.inner
            .release(path, error.map(|error| (path.clone(), error)));
    }
}

/// Ticket for one child of a [`PendingGroup`]
///
/// Dropping it without calling [`Registration::complete`] releases the unit
/// with [`SyncError::Interrupted`].
pub struct Registration {
    group: Option<Arc<Inner>>,
    path: NodePath,
}

impl Registration {
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Releases the child's unit, merging its failures into the group
    pub fn complete(mut self, result: Result<(), SyncFailures>) {
        if let Some(group) = self.group.take() {
            let failures = result.err().unwrap_or_default();
            group.release(&self.path, failures);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(group) = self.group.take() {
            let path = self.path.clone();
            group.release(
                &self.path,
                [(path.clone(), SyncError::Interrupted { path })],
            );
        }
    }
}

/// Receiving side of a [`PendingGroup`]
pub struct PendingOutcome {
    owner: NodePath,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingOutcome {
    /// Waits for the group's single resolution
    pub async fn wait(self) -> Result<NodePath, SyncFailures> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            // Every handle was dropped with units still outstanding.
            Err(_) => Err(SyncFailures::single(
                self.owner.clone(),
                SyncError::Interrupted { path: self.owner },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::node;

    fn interrupted(path: &str) -> SyncError {
        SyncError::Interrupted { path: node(path) }
    }

    mod resolution_tests {
        use super::*;

        #[tokio::test]
        async fn test_resolves_with_owner_when_no_children() {
            let (group, outcome) = PendingGroup::new(node("/app/cfg"));
            group.complete(&node("/app/cfg"), None);

            assert_eq!(outcome.wait().await.unwrap(), node("/app/cfg"));
        }

        #[tokio::test]
        async fn test_waits_for_every_registered_child() {
            let (group, mut outcome) = PendingGroup::new(node("/d"));
            let a = group.register(node("/d/a"));
            let b = group.register(node("/d/b"));
            group.complete(&node("/d"), None);

            a.complete(Ok(()));
            assert_eq!(group.remaining(), 1);
            assert!(outcome.receiver.try_recv().is_err());

            b.complete(Ok(()));
            assert_eq!(group.remaining(), 0);
            assert_eq!(outcome.wait().await.unwrap(), node("/d"));
        }

        #[tokio::test]
        async fn test_initial_unit_holds_the_group_open() {
            let (group, mut outcome) = PendingGroup::new(node("/d"));
            group.register(node("/d/a")).complete(Ok(()));

            assert_eq!(group.remaining(), 1);
            assert!(outcome.receiver.try_recv().is_err());

            group.complete(&node("/d"), None);
            assert!(outcome.wait().await.is_ok());
        }
    }

    mod error_tests {
        use super::*;

        #[tokio::test]
        async fn test_aggregates_child_failures() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            let file = group.register(node("/d/a"));
            let folder = group.register(node("/d/sub"));
            let ok = group.register(node("/d/c"));
            group.complete(&node("/d"), None);

            file.complete(Err(SyncFailures::single(node("/d/a"), interrupted("/d/a"))));
            let nested: SyncFailures = vec![
                (node("/d/sub/x"), interrupted("/d/sub/x")),
                (node("/d/sub/y"), interrupted("/d/sub/y")),
            ]
            .into_iter()
            .collect();
            folder.complete(Err(nested));
            ok.complete(Ok(()));

            let failures = outcome.wait().await.unwrap_err();
            let paths: Vec<&str> = failures.paths().map(NodePath::as_str).collect();
            assert_eq!(paths, vec!["/d/a", "/d/sub/x", "/d/sub/y"]);
        }

        #[tokio::test]
        async fn test_complete_with_error_records_it() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            group.complete(&node("/d"), Some(interrupted("/d")));

            let failures = outcome.wait().await.unwrap_err();
            assert_eq!(failures.len(), 1);
            assert!(failures.contains(&node("/d")));
        }

        #[tokio::test]
        async fn test_dropped_registration_reports_interrupted() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            let registration = group.register(node("/d/a"));
            group.complete(&node("/d"), None);
            drop(registration);

            let failures = outcome.wait().await.unwrap_err();
            assert!(matches!(
                failures.get(&node("/d/a")),
                Some(SyncError::Interrupted { .. })
            ));
        }

        #[tokio::test]
        async fn test_panicking_child_does_not_hang_the_group() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            let registration = group.register(node("/d/a"));
            let handle = tokio::spawn(async move {
                let _registration = registration;
                panic!("child failed");
            });
            group.complete(&node("/d"), None);

            assert!(handle.await.is_err());
            let failures = outcome.wait().await.unwrap_err();
            assert!(failures.contains(&node("/d/a")));
        }

        #[tokio::test]
        async fn test_over_completion_is_ignored() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            group.complete(&node("/d"), None);
            group.complete(&node("/d"), Some(interrupted("/d")));

            assert_eq!(group.remaining(), 0);
            assert_eq!(outcome.wait().await.unwrap(), node("/d"));
        }

        #[tokio::test]
        async fn test_dropped_group_without_resolution_is_interrupted() {
            let (group, outcome) = PendingGroup::new(node("/d"));
            drop(group);

            let failures = outcome.wait().await.unwrap_err();
            assert!(failures.contains(&node("/d")));
        }
    }

    mod concurrency_tests {
        use super::*;

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn test_resolves_exactly_once_under_contention() {
            for _ in 0..50 {
                let (group, outcome) = PendingGroup::new(node("/d"));
                let mut handles = Vec::new();
                for i in 0..64 {
                    let registration = group.register(node(&format!("/d/f{i}")));
                    handles.push(tokio::spawn(async move {
                        tokio::task::yield_now().await;
                        if i % 7 == 0 {
                            let path = registration.path().clone();
                            registration.complete(Err(SyncFailures::single(
                                path.clone(),
                                SyncError::Interrupted { path },
                            )));
                        } else {
                            registration.complete(Ok(()));
                        }
                    }));
                }
                group.complete(&node("/d"), None);

                for handle in handles {
                    handle.await.unwrap();
                }
                let failures = outcome.wait().await.unwrap_err();
                assert_eq!(failures.len(), 10);
                assert_eq!(group.remaining(), 0);
            }
        }
    }
}
