/// One full check: load baseline, fetch, compare, notify on change,
/// persist, publish. Each run is a fresh process; the baseline always
/// comes from the state file, never from memory.
use crate::detect::{self, Outcome};
use crate::notify::{Change, Notifier};
use crate::probe::{PageSource, ProbeError};
use crate::publish::Publisher;
use crate::state::StateStore;
use tracing::{info, warn};

/// What a completed run did.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub baseline: u64,
    pub observed: u64,
    pub outcome: Outcome,
    pub notified: bool,
    pub published: bool,
}

/// Execute a single check.
///
/// A fetch failure aborts the run before any state is written, so a bad
/// network day can never corrupt the baseline. Notification and publish
/// failures are logged and swallowed. With `dry_run` set, the run stops
/// after the comparison and touches nothing.
pub async fn run_once<S, N, P>(
    source: &S,
    store: &StateStore,
    notifier: &N,
    publisher: Option<&P>,
    dry_run: bool,
) -> Result<RunReport, ProbeError>
where
    S: PageSource,
    N: Notifier,
    P: Publisher,
{
    let baseline = store.load();
    let observation = source.observe().await?;
    let observed = observation.size;
    let outcome = detect::evaluate(baseline, observed);

    match outcome {
        Outcome::NoBaseline => info!(observed, "no baseline yet, recording first observation"),
        Outcome::Unchanged => info!(observed, "no change detected"),
        Outcome::Changed { was, now } => info!(was, now, "change detected"),
    }

    if dry_run {
        info!("dry run, skipping notification and state write");
        return Ok(RunReport {
            baseline,
            observed,
            outcome,
            notified: false,
            published: false,
        });
    }

    let mut notified = false;
    if let Some(change) = Change::from_outcome(&outcome) {
        match notifier.send(&change).await {
            Ok(()) => notified = true,
            Err(e) => warn!(error = %e, "failed to send notification, continuing"),
        }
    }

    if let Err(e) = store.save(observed) {
        warn!(error = %e, "failed to persist new baseline, continuing");
        // State write failed: nothing new on disk to publish.
        return Ok(RunReport {
            baseline,
            observed,
            outcome,
            notified,
            published: false,
        });
    }
    info!(path = %store.path().display(), observed, "baseline updated");

    let mut published = false;
    match publisher {
        Some(p) => match p.publish(store.path()) {
            Ok(()) => {
                info!("state file published to repository");
                published = true;
            }
            Err(e) => warn!(error = %e, "could not publish state file, continuing"),
        },
        None => info!("publishing disabled or credentials unavailable, skipping"),
    }

    Ok(RunReport {
        baseline,
        observed,
        outcome,
        notified,
        published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use crate::probe::Observation;
    use crate::publish::PublishError;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedSource {
        result: Mutex<Option<Result<Observation, ProbeError>>>,
    }

    impl FixedSource {
        fn size(size: u64) -> Self {
            Self {
                result: Mutex::new(Some(Ok(Observation { size }))),
            }
        }

        fn failing() -> Self {
            Self {
                result: Mutex::new(Some(Err(ProbeError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                }))),
            }
        }
    }

    impl PageSource for FixedSource {
        async fn observe(&self) -> Result<Observation, ProbeError> {
            self.result.lock().unwrap().take().expect("observe called twice")
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sends: AtomicUsize,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, _change: &Change) -> Result<(), NotifyError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Status {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    body: "invalid app_id".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        publishes: AtomicUsize,
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, _state_file: &Path) -> Result<(), PublishError> {
            self.publishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("last.json"))
    }

    #[tokio::test]
    async fn test_first_run_records_baseline_without_notifying() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let notifier = RecordingNotifier::default();

        let report = run_once(
            &FixedSource::size(1000),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, Outcome::NoBaseline);
        assert!(!report.notified);
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert_eq!(store.load(), 1000);
    }

    #[tokio::test]
    async fn test_changed_size_notifies_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(1000).unwrap();
        let notifier = RecordingNotifier::default();

        let report = run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Changed {
                was: 1000,
                now: 1200
            }
        );
        assert!(report.notified);
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 1);
        assert_eq!(store.load(), 1200);
    }

    #[tokio::test]
    async fn test_unchanged_size_does_not_notify() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(1200).unwrap();
        let notifier = RecordingNotifier::default();

        let report = run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, Outcome::Unchanged);
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert_eq!(store.load(), 1200);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_baseline_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(1000).unwrap();
        let notifier = RecordingNotifier::default();

        let result = run_once(
            &FixedSource::failing(),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert_eq!(store.load(), 1000);
    }

    #[tokio::test]
    async fn test_notification_failure_still_persists_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(1000).unwrap();
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };

        let report = run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        assert!(!report.notified);
        assert_eq!(store.load(), 1200);
    }

    #[tokio::test]
    async fn test_publisher_runs_after_state_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let notifier = RecordingNotifier::default();
        let publisher = RecordingPublisher::default();

        let report = run_once(
            &FixedSource::size(500),
            &store,
            &notifier,
            Some(&publisher),
            false,
        )
        .await
        .unwrap();

        assert!(report.published);
        assert_eq!(publisher.publishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(1000).unwrap();
        let notifier = RecordingNotifier::default();
        let publisher = RecordingPublisher::default();

        let report = run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            Some(&publisher),
            true,
        )
        .await
        .unwrap();

        assert!(report.outcome.is_change());
        assert!(!report.notified);
        assert!(!report.published);
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.publishes.load(Ordering::SeqCst), 0);
        assert_eq!(store.load(), 1000);
    }

    #[tokio::test]
    async fn test_rerun_with_same_size_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let notifier = RecordingNotifier::default();

        // First run establishes the baseline.
        run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        // Second run with the same size: no notification.
        let report = run_once(
            &FixedSource::size(1200),
            &store,
            &notifier,
            None::<&RecordingPublisher>,
            false,
        )
        .await
        .unwrap();

        assert_eq!(report.outcome, Outcome::Unchanged);
        assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
    }
}
