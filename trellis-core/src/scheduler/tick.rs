//! Tick sources.
//!
//! A [`Ticker`] decides when "the next tick" is. The runtime only ever asks
//! it to run a job later; it never blocks on one.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A deferred unit of work.
pub type Job = Box<dyn FnOnce()>;

/// Something that can run jobs on a later turn of the host's loop.
pub trait Ticker {
    /// Arrange for `job` to run after the current synchronous work.
    fn schedule(&self, job: Job);

    /// Run jobs that are ready, returning how many ran. Tick sources driven
    /// by an external event loop have nothing to run here.
    fn run_pending(&self) -> usize {
        0
    }
}

/// An in-process FIFO of jobs, drained explicitly by the host.
#[derive(Default)]
pub struct QueueTicker {
    jobs: RefCell<VecDeque<Job>>,
}

impl QueueTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }
}

impl Ticker for QueueTicker {
    fn schedule(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow must end before the job runs: jobs schedule jobs.
            let job = self.jobs.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

/// Schedules each job as a task on the current tokio `LocalSet`.
///
/// Must be used from inside `LocalSet::run_until` (or a `LocalSet` being
/// polled), since jobs are not `Send`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTicker;

impl Ticker for TokioTicker {
    fn schedule(&self, job: Job) {
        tokio::task::spawn_local(async move { job() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn queue_ticker_runs_jobs_in_order() {
        let ticker = Rc::new(QueueTicker::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            ticker.schedule(Box::new(move || log.borrow_mut().push(i)));
        }
        assert_eq!(ticker.len(), 3);
        assert_eq!(ticker.run_pending(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(ticker.is_empty());
    }

    #[test]
    fn jobs_may_schedule_more_jobs() {
        let ticker = Rc::new(QueueTicker::new());
        let hits = Rc::new(Cell::new(0));

        let inner_ticker = ticker.clone();
        let inner_hits = hits.clone();
        ticker.schedule(Box::new(move || {
            inner_hits.set(inner_hits.get() + 1);
            let hits = inner_hits.clone();
            inner_ticker.schedule(Box::new(move || hits.set(hits.get() + 1)));
        }));

        assert_eq!(ticker.run_pending(), 2);
        assert_eq!(hits.get(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_ticker_runs_on_local_set() {
        let local = tokio::task::LocalSet::new();
        let hits = Rc::new(Cell::new(0));

        let task_hits = hits.clone();
        local
            .run_until(async move {
                TokioTicker.schedule(Box::new(move || task_hits.set(1)));
                tokio::task::yield_now().await;
            })
            .await;
        local.await;

        assert_eq!(hits.get(), 1);
    }
}
