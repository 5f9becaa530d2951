use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::AmbraResult;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    /// The single pending slot. Submitting replaces whatever is here.
    pending: Option<Job>,
    /// When the pending job is due to run
    fire_at: Instant,
    /// Earliest time the next job may run
    next_allowed: Instant,
    shutdown: bool,
}

/// Leading/trailing rate limiter with a single pending slot.
///
/// The first job after a quiet period runs immediately. Jobs submitted inside
/// the delay window replace the pending one and run once the window elapses,
/// so rapid submissions coalesce into at most one trailing run. A replaced
/// job never runs.
pub(crate) struct Throttle {
    shared: Arc<(Mutex<State>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

fn lock_state<'a>(lock: &'a Mutex<State>) -> MutexGuard<'a, State> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Throttle {
    pub(crate) fn new(delay: Duration) -> AmbraResult<Self> {
        let now = Instant::now();
        let shared = Arc::new((
            Mutex::new(State {
                pending: None,
                fire_at: now,
                next_allowed: now,
                shutdown: false,
            }),
            Condvar::new(),
        ));

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("ambra-throttle".to_owned())
            .spawn(move || worker_loop(worker_shared, delay))?;

        Ok(Throttle {
            shared,
            worker: Some(worker),
        })
    }

    /// Schedules `job`, replacing any pending one. Runs at
    /// `max(now, next_allowed)`, so a job submitted after a quiet period runs
    /// right away.
    pub(crate) fn submit(&self, job: Job) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock_state(lock);
        let now = Instant::now();
        state.fire_at = state.next_allowed.max(now);
        if state.pending.is_some() {
            log::debug!("replacing pending highlight pass");
        }
        state.pending = Some(job);
        cvar.notify_one();
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.shared;
        {
            let mut state = lock_state(lock);
            state.shutdown = true;
            // Pending work is cancelled, mirroring a cleared timeout
            state.pending = None;
            cvar.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<(Mutex<State>, Condvar)>, delay: Duration) {
    let (lock, cvar) = &*shared;
    let mut state = lock_state(lock);

    loop {
        if state.shutdown {
            return;
        }

        if state.pending.is_none() {
            state = match cvar.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            continue;
        }

        let now = Instant::now();
        if now < state.fire_at {
            let wait = state.fire_at - now;
            state = match cvar.wait_timeout(state, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
            continue;
        }

        let job = state.pending.take();
        state.next_allowed = state.fire_at + delay;
        drop(state);
        if let Some(job) = job {
            job();
        }
        state = lock_state(lock);
    }
}
