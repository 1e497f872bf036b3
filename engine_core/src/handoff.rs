//! Synchronous tick hand-off from the scheduler thread to the thread that
//! owns the window.
//!
//! The scheduler submits one job at a time and blocks until the owning
//! thread has run it, so a tick is never overlapped by the next one and the
//! measured frame time includes the work done on the other side.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::trace;

use crate::error::{EngineError, EngineResult};
use crate::frame::FrameStats;
use crate::scheduler::TickTarget;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Job {
    Init,
    Tick(FrameStats),
    Destroy,
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Init => JobKind::Init,
            Job::Tick(_) => JobKind::Tick,
            Job::Destroy => JobKind::Destroy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Init,
    Tick,
    Destroy,
}

/// Nudges the owning thread to poll. Returns false when it is gone.
pub type Wake = Box<dyn Fn() -> bool + Send>;

pub fn channel(wake: Wake) -> (HandoffSender, HandoffReceiver) {
    let (job_tx, job_rx) = bounded(1);
    let (reply_tx, reply_rx) = bounded(1);
    (
        HandoffSender {
            jobs: job_tx,
            replies: reply_rx,
            wake,
        },
        HandoffReceiver {
            jobs: job_rx,
            replies: reply_tx,
        },
    )
}

pub struct HandoffSender {
    jobs: Sender<Job>,
    replies: Receiver<EngineResult<()>>,
    wake: Wake,
}

impl HandoffSender {
    /// Queues `job`, wakes the owner and waits for it to finish.
    pub fn submit(&self, job: Job) -> EngineResult<()> {
        self.jobs
            .send(job)
            .map_err(|_| EngineError::Handoff("receiver dropped"))?;
        if !(self.wake)() {
            return Err(EngineError::Handoff("owner thread is gone"));
        }
        self.replies
            .recv()
            .map_err(|_| EngineError::Handoff("receiver dropped before replying"))?
    }
}

pub struct HandoffReceiver {
    jobs: Receiver<Job>,
    replies: Sender<EngineResult<()>>,
}

impl HandoffReceiver {
    /// Runs the pending job, if any, and sends its result back.
    pub fn poll<F>(&self, run: F) -> Option<JobKind>
    where
        F: FnOnce(Job) -> EngineResult<()>,
    {
        let job = match self.jobs.try_recv() {
            Ok(job) => job,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                trace!(target: "runtime", "hand-off sender dropped");
                return None;
            }
        };
        let kind = job.kind();
        let result = run(job);
        // The scheduler may already be gone after a failed wake.
        let _ = self.replies.send(result);
        Some(kind)
    }
}

/// Scheduler target that runs every phase on the receiving thread.
pub struct HandoffTarget {
    sender: HandoffSender,
}

impl HandoffTarget {
    pub fn new(sender: HandoffSender) -> Self {
        Self { sender }
    }
}

impl TickTarget for HandoffTarget {
    fn init(&mut self) -> EngineResult<()> {
        self.sender.submit(Job::Init)
    }

    fn tick(&mut self, stats: &FrameStats) -> EngineResult<()> {
        self.sender.submit(Job::Tick(*stats))
    }

    fn destroy(&mut self) -> EngineResult<()> {
        self.sender.submit(Job::Destroy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn poll_without_a_job_does_nothing() {
        let (_tx, rx) = channel(Box::new(|| true));
        assert_eq!(rx.poll(|_| panic!("no job queued")), None);
    }

    #[test]
    fn submit_blocks_until_the_job_ran() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let (tx, rx) = channel(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));

        let producer = thread::spawn(move || {
            let mut target = HandoffTarget::new(tx);
            target.init()?;
            target.tick(&FrameStats::default())?;
            target.destroy()
        });

        let mut seen = Vec::new();
        while seen.last() != Some(&JobKind::Destroy) {
            if let Some(kind) = rx.poll(|_| Ok(())) {
                seen.push(kind);
            } else {
                thread::yield_now();
            }
        }

        producer.join().unwrap().unwrap();
        assert_eq!(seen, vec![JobKind::Init, JobKind::Tick, JobKind::Destroy]);
        assert_eq!(wakes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn job_error_comes_back_to_the_submitter() {
        let (tx, rx) = channel(Box::new(|| true));
        let producer = thread::spawn(move || tx.submit(Job::Init));

        while rx.poll(|_| Err(EngineError::Other("init failed".into()))).is_none() {
            thread::yield_now();
        }
        let err = producer.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::Other(_)));
    }

    #[test]
    fn dropped_receiver_fails_the_submit() {
        let (tx, rx) = channel(Box::new(|| true));
        drop(rx);
        assert!(matches!(tx.submit(Job::Init), Err(EngineError::Handoff(_))));
    }

    #[test]
    fn failed_wake_fails_the_submit() {
        let (tx, _rx) = channel(Box::new(|| false));
        assert!(matches!(tx.submit(Job::Init), Err(EngineError::Handoff(_))));
    }
}
