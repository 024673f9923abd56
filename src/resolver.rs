//! Update resolution over an ordered chain of version sources
//!
//! Sources are queried one at a time in priority order. A failing source is
//! logged and skipped. By default the first source reporting a strictly newer
//! version ends the search; with [`VersionResolver::first_answer_decides`]
//! the first parsed version ends it, newer or not.

use crate::domain::VersionAdvisory;
use crate::source::VersionSource;
use crate::version::{is_newer, VersionRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Drives version sources and produces an advisory
#[derive(Debug, Clone)]
pub struct VersionResolver {
    subject: String,
    first_answer_decides: bool,
}

impl VersionResolver {
    /// Create a resolver for the named application or tool
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            first_answer_decides: false,
        }
    }

    /// Stop at the first parsed version even when it is not newer
    ///
    /// Lower priority sources are then only consulted while the ones before
    /// them fail.
    pub fn first_answer_decides(mut self) -> Self {
        self.first_answer_decides = true;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Compare `local` against each source in order
    ///
    /// Never fails: when nothing newer is found, or the local version is
    /// unknown, the advisory reports "up to date".
    pub async fn resolve(
        &self,
        local: &VersionRecord,
        sources: &[Box<dyn VersionSource>],
    ) -> VersionAdvisory {
        let Some(local_version) = local.version() else {
            log::debug!(
                "local version of {} unknown, skipping update check",
                self.subject
            );
            return VersionAdvisory::up_to_date(&self.subject, None);
        };

        for (idx, source) in sources.iter().enumerate() {
            let record = match source.fetch_version().await {
                Ok(record) => record,
                Err(e) => {
                    log::debug!("version source '{}' failed: {}", source.name(), e);
                    continue;
                }
            };
            let Some(candidate) = record.version() else {
                log::debug!("version source '{}' returned nothing usable", source.name());
                continue;
            };
            if !is_newer(candidate, local_version) {
                if self.first_answer_decides {
                    log::debug!(
                        "{} {} from '{}' is not newer than {}",
                        self.subject,
                        candidate,
                        source.name(),
                        local_version
                    );
                    break;
                }
                continue;
            }

            let url = non_blank(source.download_url()).or_else(|| {
                sources
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != idx)
                    .find_map(|(_, s)| non_blank(s.download_url()))
            });
            log::info!(
                "{} {} is available (local {}), reported by {}",
                self.subject,
                candidate,
                local_version,
                source.name()
            );
            return VersionAdvisory::newer(
                &self.subject,
                local_version,
                candidate,
                url,
                source.name(),
            );
        }

        VersionAdvisory::up_to_date(&self.subject, Some(local_version.to_string()))
    }

    /// Run [`resolve`](Self::resolve) on a background task
    ///
    /// The advisory is delivered on the returned channel. Cancelling the
    /// token drops the check without sending anything.
    pub fn spawn_check(
        self,
        local: VersionRecord,
        sources: Vec<Box<dyn VersionSource>>,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<VersionAdvisory>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("update check for {} cancelled", self.subject);
                }
                advisory = self.resolve(&local, &sources) => {
                    // receiver may be gone if the caller stopped waiting
                    let _ = tx.send(advisory).await;
                }
            }
        });
        (rx, handle)
    }
}

fn non_blank(url: String) -> Option<String> {
    if url.trim().is_empty() {
        None
    } else {
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct MockSource {
        name: &'static str,
        result: Result<VersionRecord, SourceError>,
        url: &'static str,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    impl MockSource {
        fn ok(name: &'static str, version: &str, url: &'static str) -> Self {
            Self {
                name,
                result: Ok(VersionRecord::parsed(version)),
                url,
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                result: Err(SourceError::unavailable(name, "connection refused")),
                url: "",
                calls: Arc::new(AtomicUsize::new(0)),
                delay: None,
            }
        }

        fn returning(name: &'static str, record: VersionRecord) -> Self {
            Self {
                result: Ok(record),
                ..Self::failing(name)
            }
        }
    }

    #[async_trait]
    impl VersionSource for MockSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_version(&self) -> Result<VersionRecord, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.result.clone()
        }

        fn download_url(&self) -> String {
            self.url.to_string()
        }
    }

    fn boxed(sources: Vec<MockSource>) -> Vec<Box<dyn VersionSource>> {
        sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn VersionSource>)
            .collect()
    }

    #[tokio::test]
    async fn test_falls_back_after_failing_source() {
        let sources = boxed(vec![
            MockSource::failing("remote"),
            MockSource::ok("mirror", "18.0", "https://mirror/dl"),
        ]);
        let advisory = VersionResolver::new("FragPipe")
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("18.0"));
        assert_eq!(advisory.download_url.as_deref(), Some("https://mirror/dl"));
        assert_eq!(advisory.source.as_deref(), Some("mirror"));
    }

    #[tokio::test]
    async fn test_nothing_newer_is_up_to_date() {
        let sources = boxed(vec![
            MockSource::ok("remote", "17.1", "https://a"),
            MockSource::ok("bundled", "17.0", "https://b"),
        ]);
        let advisory = VersionResolver::new("FragPipe")
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert!(!advisory.has_update());
        assert!(advisory.is_empty());
        assert_eq!(advisory.local_version.as_deref(), Some("17.1"));
    }

    #[tokio::test]
    async fn test_stops_at_first_newer() {
        let second = MockSource::ok("second", "20.0", "https://b");
        let second_calls = second.calls.clone();
        let sources = boxed(vec![MockSource::ok("first", "18.0", "https://a"), second]);
        let advisory = VersionResolver::new("FragPipe")
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("18.0"));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_newer_moves_on_by_default() {
        let sources = boxed(vec![
            MockSource::ok("server", "3.4", "https://a"),
            MockSource::ok("mirror", "3.5", "https://b"),
        ]);
        let advisory = VersionResolver::new("MSFragger")
            .resolve(&VersionRecord::parsed("3.4"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("3.5"));
    }

    #[tokio::test]
    async fn test_first_answer_decides() {
        let dev = MockSource::ok("dev", "18.0-build3", "https://dev");
        let dev_calls = dev.calls.clone();
        let sources = boxed(vec![MockSource::ok("release", "17.1", "https://rel"), dev]);
        let advisory = VersionResolver::new("FragPipe")
            .first_answer_decides()
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert!(!advisory.has_update());
        assert_eq!(dev_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_answer_decides_skips_failures() {
        let sources = boxed(vec![
            MockSource::failing("release"),
            MockSource::ok("dev", "18.0-build3", "https://dev"),
        ]);
        let advisory = VersionResolver::new("FragPipe")
            .first_answer_decides()
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("18.0-build3"));
        assert_eq!(advisory.source.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_blank_url_falls_back_to_other_source() {
        let sources = boxed(vec![
            MockSource::ok("remote", "18.0", ""),
            MockSource::ok("local", "3.0", "https://local/dl"),
        ]);
        let advisory = VersionResolver::new("MSFragger")
            .resolve(&VersionRecord::parsed("3.4"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("18.0"));
        assert_eq!(advisory.download_url.as_deref(), Some("https://local/dl"));
    }

    #[tokio::test]
    async fn test_unparsed_records_are_skipped() {
        let sources = boxed(vec![
            MockSource::returning("remote", VersionRecord::unparsed("99.0")),
            MockSource::returning("empty", VersionRecord::parsed("  ")),
            MockSource::ok("bundled", "17.2", "https://b"),
        ]);
        let advisory = VersionResolver::new("FragPipe")
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert_eq!(advisory.remote_version.as_deref(), Some("17.2"));
    }

    #[tokio::test]
    async fn test_unknown_local_version_is_never_oldest() {
        let first = MockSource::ok("remote", "99.0", "https://a");
        let calls = first.calls.clone();
        let advisory = VersionResolver::new("MSFragger")
            .resolve(&VersionRecord::unparsed(""), &boxed(vec![first]))
            .await;
        assert!(!advisory.has_update());
        assert!(advisory.local_version.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_up_to_date() {
        let sources = boxed(vec![MockSource::failing("a"), MockSource::failing("b")]);
        let advisory = VersionResolver::new("FragPipe")
            .resolve(&VersionRecord::parsed("17.1"), &sources)
            .await;
        assert!(!advisory.has_update());
    }

    #[tokio::test]
    async fn test_spawn_check_delivers_result() {
        let sources = boxed(vec![MockSource::ok("remote", "18.0", "https://a")]);
        let (mut rx, handle) = VersionResolver::new("FragPipe").spawn_check(
            VersionRecord::parsed("17.1"),
            sources,
            CancellationToken::new(),
        );
        let advisory = rx.recv().await.unwrap();
        assert!(advisory.has_update());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_check_cancelled() {
        let mut slow = MockSource::ok("remote", "18.0", "https://a");
        slow.delay = Some(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let (mut rx, handle) = VersionResolver::new("FragPipe").spawn_check(
            VersionRecord::parsed("17.1"),
            boxed(vec![slow]),
            cancel.clone(),
        );
        cancel.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
