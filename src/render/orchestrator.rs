//! Fan-out of per-record formatting over a bounded task pool.
//!
//! Tasks complete in any order; the fetch order is restored by sorting the
//! collected fragments on their stored index. A record that fails or panics
//! during formatting yields exactly one inline error fragment at its
//! original position.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::record::Record;

use super::{RecordFormatter, RenderedFragment};

/// A progress line is logged every this many completions.
const PROGRESS_EVERY: usize = 10;

/// Renders every record and returns the fragments in fetch order.
///
/// `concurrency` bounds the number of in-flight formatting tasks; values
/// below 1 are treated as 1.
#[instrument(skip(records, formatter), fields(records = records.len()))]
pub async fn render_all(
    records: Vec<Record>,
    formatter: Arc<dyn RecordFormatter>,
    concurrency: usize,
) -> Vec<RenderedFragment> {
    let total = records.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut tasks: JoinSet<RenderedFragment> = JoinSet::new();
    for (index, record) in records.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let formatter = Arc::clone(&formatter);
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(closed) => {
                    return RenderedFragment {
                        index,
                        body: formatter.error_fragment(index, &closed.to_string()),
                        ok: false,
                    };
                }
            };
            // The inner spawn confines a formatter panic to this record.
            let inner = {
                let formatter = Arc::clone(&formatter);
                tokio::spawn(async move { formatter.format_fragment(index, &record).await })
            };
            match inner.await {
                Ok(Ok(body)) => RenderedFragment {
                    index,
                    body,
                    ok: true,
                },
                Ok(Err(error)) => {
                    warn!(index, error = %error, "record formatting failed");
                    RenderedFragment {
                        index,
                        body: formatter.error_fragment(index, &error.to_string()),
                        ok: false,
                    }
                }
                Err(join_error) => {
                    warn!(index, error = %join_error, "record formatting panicked");
                    RenderedFragment {
                        index,
                        body: formatter.error_fragment(index, "formatting task panicked"),
                        ok: false,
                    }
                }
            }
        });
    }

    let mut fragments = Vec::with_capacity(total);
    let mut completed = 0usize;
    while let Some(result) = tasks.join_next().await {
        if let Ok(fragment) = result {
            completed += 1;
            if completed % PROGRESS_EVERY == 0 || completed == total {
                info!(completed, total, "formatted records");
            }
            fragments.push(fragment);
        }
    }

    fragments.sort_by_key(|fragment| fragment.index);
    fragments
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use rand::Rng;
    use std::time::Duration;

    use super::*;
    use crate::record::{OtherFields, RecordDetails, StorageRef};
    use crate::render::RenderError;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                id: i.to_string(),
                title: format!("title-{i}"),
                creators: vec![],
                date: None,
                details: RecordDetails::Other(OtherFields::default()),
                storage: StorageRef::None,
            })
            .collect()
    }

    /// Sleeps a random few milliseconds so completion order is scrambled.
    struct JitterFormatter;

    #[async_trait]
    impl RecordFormatter for JitterFormatter {
        async fn format_fragment(
            &self,
            index: usize,
            record: &Record,
        ) -> Result<String, RenderError> {
            let delay = rand::thread_rng().gen_range(0..20u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("frag {index} {}", record.title))
        }

        fn error_fragment(&self, index: usize, message: &str) -> String {
            format!("error {index}: {message}")
        }
    }

    /// Fails on one index, panics on another, succeeds elsewhere.
    struct FaultyFormatter {
        fail_at: usize,
        panic_at: usize,
    }

    #[async_trait]
    impl RecordFormatter for FaultyFormatter {
        async fn format_fragment(
            &self,
            index: usize,
            _record: &Record,
        ) -> Result<String, RenderError> {
            if index == self.fail_at {
                return Err(RenderError::Failed("synthetic failure".to_string()));
            }
            assert!(index != self.panic_at, "synthetic panic");
            Ok(format!("frag {index}"))
        }

        fn error_fragment(&self, index: usize, message: &str) -> String {
            format!("error {index}: {message}")
        }
    }

    #[tokio::test]
    async fn test_output_order_matches_input_order_despite_jitter() {
        let fragments = render_all(records(25), Arc::new(JitterFormatter), 8).await;
        assert_eq!(fragments.len(), 25);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.index, i);
            assert!(fragment.body.starts_with(&format!("frag {i} ")));
            assert!(fragment.ok);
        }
    }

    #[tokio::test]
    async fn test_failing_record_becomes_error_fragment_in_place() {
        let formatter = FaultyFormatter {
            fail_at: 2,
            panic_at: usize::MAX,
        };
        let fragments = render_all(records(5), Arc::new(formatter), 4).await;
        assert_eq!(fragments.len(), 5);
        assert!(!fragments[2].ok);
        assert_eq!(fragments[2].body, "error 2: synthetic failure");
        for i in [0, 1, 3, 4] {
            assert!(fragments[i].ok);
        }
    }

    #[tokio::test]
    async fn test_panicking_record_does_not_abort_batch() {
        let formatter = FaultyFormatter {
            fail_at: usize::MAX,
            panic_at: 1,
        };
        let fragments = render_all(records(4), Arc::new(formatter), 2).await;
        assert_eq!(fragments.len(), 4);
        assert!(!fragments[1].ok);
        assert!(fragments[1].body.contains("panicked"));
        assert!(fragments[0].ok && fragments[2].ok && fragments[3].ok);
    }

    #[tokio::test]
    async fn test_concurrency_of_zero_is_clamped() {
        let fragments = render_all(records(3), Arc::new(JitterFormatter), 0).await;
        assert_eq!(fragments.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_record_set_renders_nothing() {
        let fragments = render_all(Vec::new(), Arc::new(JitterFormatter), 4).await;
        assert!(fragments.is_empty());
    }
}
