//! Bounded worker pool with keyed writeback and periodic flushes

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use papertrail_core::WorkQueue;

/// Counters returned by [`EnrichPool::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub completed: usize,
    /// Flushes including the final one
    pub flushes: usize,
}

struct Shared<T> {
    target: T,
    completed: usize,
    flushes: usize,
    error: Option<anyhow::Error>,
}

/// Fans queue items out over a fixed number of rayon threads.
///
/// Results are applied to a shared target under one mutex, keyed by the
/// item's original index. Every `flush_every` completions, and once at the
/// end, `flush` runs under that same mutex, so flushes never overlap with
/// each other or with a writeback. A failing flush stops workers from
/// claiming new items and is returned.
pub struct EnrichPool {
    workers: usize,
    flush_every: usize,
    progress: Option<ProgressBar>,
}

impl EnrichPool {
    pub fn new(workers: usize, flush_every: usize) -> Self {
        Self {
            workers: workers.max(1),
            flush_every: flush_every.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    pub fn run<S, T, O, W, A, F>(
        &self,
        queue: &WorkQueue<S>,
        target: T,
        work: W,
        apply: A,
        flush: F,
    ) -> Result<(T, PoolStats)>
    where
        S: Sync,
        T: Send,
        O: Send,
        W: Fn(usize, &S) -> O + Sync,
        A: Fn(&mut T, usize, O) + Sync,
        F: Fn(&T) -> Result<()> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("enrich-{i}"))
            .build()
            .context("Failed to create thread pool")?;

        let shared = Mutex::new(Shared {
            target,
            completed: 0,
            flushes: 0,
            error: None,
        });
        let stop = AtomicBool::new(false);

        pool.scope(|s| {
            for _ in 0..self.workers {
                s.spawn(|_| {
                    while let Some((idx, item)) = queue.next() {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let out = work(idx, item);

                        let mut guard = shared.lock().expect("worker thread panicked");
                        let sh = &mut *guard;
                        apply(&mut sh.target, idx, out);
                        sh.completed += 1;
                        if let Some(pb) = &self.progress {
                            pb.inc(1);
                        }
                        if sh.completed % self.flush_every == 0 && sh.error.is_none() {
                            log::debug!("Flushing after {} completions", sh.completed);
                            match flush(&sh.target) {
                                Ok(()) => sh.flushes += 1,
                                Err(e) => {
                                    log::error!("Flush failed, stopping workers: {e:#}");
                                    sh.error = Some(e);
                                    stop.store(true, Ordering::Relaxed);
                                }
                            }
                        }
                    }
                });
            }
        });

        let mut sh = shared.into_inner().expect("worker thread panicked");
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        if let Some(e) = sh.error.take() {
            return Err(e);
        }
        flush(&sh.target)?;
        sh.flushes += 1;
        Ok((
            sh.target,
            PoolStats {
                completed: sh.completed,
                flushes: sh.flushes,
            },
        ))
    }
}
