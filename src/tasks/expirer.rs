//! TTL Expirer
//!
//! Per-partition background worker that removes items as they expire.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::cache::store::{Shared, SweepStep};

// == Stop Signal ==
/// Wakeable stop flag; waiting on it doubles as the expirer's sleep.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleeps for `timeout` or until stopped. Returns true once stopped.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.cond.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

// == Expirer ==
/// Handle to a running expirer thread. Dropping it stops the thread.
pub struct Expirer {
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Expirer {
    /// Starts the sweep loop for a partition.
    ///
    /// The loop sleeps until the soonest known expiry (or `idle` when nothing is
    /// tracked), removes what is due, and exits once stopped.
    pub(crate) fn spawn<V>(shared: Arc<Shared<V>>, idle: Duration) -> io::Result<Self>
    where
        V: Send + Sync + 'static,
    {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name(format!("expirer-{}", shared.name()))
            .spawn(move || run(&shared, &thread_signal, idle))?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Signals the loop and waits for it to exit.
    pub fn stop(&mut self) {
        self.signal.stop();
        if let Some(handle) = self.handle.take() {
            // An eviction callback may drop the cache from the expirer thread itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Expirer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<V>(shared: &Shared<V>, signal: &StopSignal, idle: Duration) {
    info!(cache = %shared.name(), ttl = ?idle, "expirer started");
    let mut removed: u64 = 0;

    while !signal.is_stopped() {
        let pause = match shared.sweep() {
            SweepStep::Expired(..) => {
                removed += 1;
                continue;
            }
            SweepStep::Idle => idle,
            SweepStep::WaitUntil(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
        };
        if removed > 0 {
            debug!(cache = %shared.name(), removed, "expiry sweep finished");
            removed = 0;
        }
        if signal.wait(pause) {
            break;
        }
    }

    info!(cache = %shared.name(), "expirer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, UNLIMITED};
    use std::time::Instant;

    #[test]
    fn test_stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::default());
        let waiter = Arc::clone(&signal);
        let started = Instant::now();
        let handle = thread::spawn(move || waiter.wait(Duration::from_secs(30)));

        thread::sleep(Duration::from_millis(20));
        signal.stop();

        assert!(handle.join().unwrap());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_times_out_without_stop() {
        let signal = StopSignal::default();
        assert!(!signal.wait(Duration::from_millis(5)));
        assert!(!signal.is_stopped());
    }

    #[test]
    fn test_only_ttl_partitions_run_expirer() {
        let plain: Cache<String> = Cache::new(UNLIMITED, Duration::ZERO, false, vec![]);
        let timed: Cache<String> = Cache::new(UNLIMITED, Duration::from_secs(60), false, vec![]);

        assert!(plain.expirer.is_none());
        assert!(timed.expirer.as_ref().is_some_and(Expirer::is_running));
    }

    #[test]
    fn test_shutdown_joins_idle_expirer_promptly() {
        let mut cache: Cache<String> =
            Cache::new(UNLIMITED, Duration::from_secs(3600), false, vec![]);
        let started = Instant::now();
        cache.shutdown();

        assert!(cache.expirer.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
