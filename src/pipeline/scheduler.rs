//! Page scheduling over a worker pool.
//!
//! Each page runs as an independent task on a rayon pool. Workers report
//! back over a channel, and results land in a slot arena indexed by page so
//! the output order never depends on completion order. The coordinating
//! thread enforces per-page timeouts and cancellation; a worker that
//! overruns its budget is abandoned and its late result is discarded.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

use super::CancellationToken;
use crate::error::{Error, Result};

/// How often the coordinator wakes up to check deadlines and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Final state of one page.
#[derive(Debug)]
pub(crate) enum PageSlot<T> {
    /// No result (fail-fast stopped before this page resolved)
    Pending,
    /// The page finished
    Done(T),
    /// The page failed or timed out
    Failed(Error),
    /// The page never ran because the run was cancelled
    Skipped,
}

impl<T> PageSlot<T> {
    fn is_pending(&self) -> bool {
        matches!(self, PageSlot::Pending)
    }
}

enum Event<T> {
    Started { index: usize, at: Instant },
    Finished { index: usize, outcome: Result<T> },
    Skipped { index: usize },
}

/// Runs page jobs with bounded parallelism.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    workers: usize,
    page_timeout: Option<Duration>,
    fail_fast: bool,
    cancel: CancellationToken,
}

impl Scheduler {
    pub(crate) fn new(
        workers: usize,
        page_timeout: Option<Duration>,
        fail_fast: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            workers: workers.max(1),
            page_timeout,
            fail_fast,
            cancel,
        }
    }

    /// Run `job` for every page index and collect the outcomes by index.
    ///
    /// In fail-fast mode no page after the first failed one is started, and
    /// the call returns as soon as every page before it has resolved.
    pub(crate) fn run<T, F>(&self, page_count: usize, job: F) -> Result<Vec<PageSlot<T>>>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<T> + Send + Sync + 'static,
    {
        let mut slots: Vec<PageSlot<T>> = (0..page_count).map(|_| PageSlot::Pending).collect();
        if page_count == 0 {
            return Ok(slots);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.min(page_count))
            .thread_name(|i| format!("pdfstruct-page-{}", i))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build worker pool: {}", e)))?;

        // Lowest failed page index; in fail-fast mode pages above it are not started
        let first_failure = Arc::new(AtomicUsize::new(usize::MAX));
        let (tx, rx) = unbounded::<Event<T>>();
        let job = Arc::new(job);

        for index in 0..page_count {
            let tx = tx.clone();
            let job = Arc::clone(&job);
            let cancel = self.cancel.clone();
            let first_failure = Arc::clone(&first_failure);
            let fail_fast = self.fail_fast;
            pool.spawn(move || {
                let after_failure = fail_fast && index > first_failure.load(Ordering::SeqCst);
                if cancel.is_cancelled() || after_failure {
                    send(&tx, Event::Skipped { index });
                    return;
                }
                send(&tx, Event::Started { index, at: Instant::now() });
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(index)))
                    .unwrap_or_else(|payload| {
                        Err(Error::TextExtraction {
                            page: index as u32 + 1,
                            message: format!("worker panicked: {}", panic_message(&payload)),
                        })
                    });
                send(&tx, Event::Finished { index, outcome });
            });
        }
        drop(tx);

        let run_started = Instant::now();
        let mut started: Vec<Option<Instant>> = vec![None; page_count];
        let mut unresolved = page_count;
        let mut stalled = 0usize;
        let mut stalled_since: Option<Instant> = None;
        let mut cancelled = false;

        while unresolved > 0 {
            if !cancelled && self.cancel.is_cancelled() {
                cancelled = true;
                log::info!("Extraction cancelled; skipping pages not yet started");
                for (slot, start) in slots.iter_mut().zip(&started) {
                    if slot.is_pending() && start.is_none() {
                        *slot = PageSlot::Skipped;
                        unresolved -= 1;
                    }
                }
                if unresolved == 0 {
                    break;
                }
            }

            if self.fail_fast {
                let limit = first_failure.load(Ordering::SeqCst);
                if limit != usize::MAX && slots[..limit].iter().all(|s| !s.is_pending()) {
                    log::debug!("Fail-fast: page {} failed, stopping", limit + 1);
                    break;
                }
            }

            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Event::Started { index, at }) => {
                    if slots[index].is_pending() {
                        started[index] = Some(at);
                    }
                }
                Ok(Event::Finished { index, outcome }) => {
                    if slots[index].is_pending() {
                        unresolved -= 1;
                        slots[index] = match outcome {
                            Ok(value) => PageSlot::Done(value),
                            Err(err) => {
                                log::warn!("Page {} failed: {}", index + 1, err);
                                self.record_failure(&first_failure, index);
                                PageSlot::Failed(err)
                            }
                        };
                    } else if started[index].is_some() {
                        // Result of a page that already timed out
                        stalled = stalled.saturating_sub(1);
                        log::debug!("Discarding late result for page {}", index + 1);
                    }
                }
                Ok(Event::Skipped { index }) => {
                    if slots[index].is_pending() {
                        unresolved -= 1;
                        slots[index] = PageSlot::Skipped;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Every task has reported; anything left never ran
                    for slot in slots.iter_mut().filter(|s| s.is_pending()) {
                        *slot = PageSlot::Skipped;
                    }
                    break;
                }
            }

            let Some(timeout) = self.page_timeout else {
                continue;
            };
            let now = Instant::now();
            for index in 0..page_count {
                let Some(at) = started[index] else { continue };
                let elapsed = now.duration_since(at);
                if slots[index].is_pending() && elapsed >= timeout {
                    log::warn!(
                        "Page {} exceeded timeout of {} ms",
                        index + 1,
                        timeout.as_millis()
                    );
                    slots[index] = PageSlot::Failed(Error::Timeout {
                        page: index as u32 + 1,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                    self.record_failure(&first_failure, index);
                    unresolved -= 1;
                    stalled += 1;
                }
            }

            // Queued pages fail only once every worker has been stuck on an
            // abandoned page for a whole page timeout
            if stalled < self.workers.min(page_count) {
                stalled_since = None;
                continue;
            }
            let since = *stalled_since.get_or_insert(now);
            let stall = now.duration_since(since);
            if stall < timeout {
                continue;
            }
            for (index, slot) in slots.iter_mut().enumerate() {
                if slot.is_pending() && started[index].is_none() {
                    log::warn!(
                        "Page {} could not start: all workers stalled for {} ms",
                        index + 1,
                        stall.as_millis()
                    );
                    *slot = PageSlot::Failed(Error::Timeout {
                        page: index as u32 + 1,
                        elapsed_ms: stall.as_millis() as u64,
                    });
                    self.record_failure(&first_failure, index);
                    unresolved -= 1;
                }
            }
        }

        log::debug!(
            "Scheduled {} pages on {} workers in {:?}",
            page_count,
            self.workers.min(page_count),
            run_started.elapsed()
        );
        Ok(slots)
    }

    fn record_failure(&self, first_failure: &AtomicUsize, index: usize) {
        if self.fail_fast {
            first_failure.fetch_min(index, Ordering::SeqCst);
        }
    }
}

fn send<T>(tx: &Sender<Event<T>>, event: Event<T>) {
    // The coordinator may already have returned
    let _ = tx.send(event);
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
