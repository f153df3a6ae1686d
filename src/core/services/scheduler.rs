use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::models::keylist::KeylistRecord;
use crate::core::models::outcome::SyncReport;
use crate::core::services::engine::SyncEngine;

enum Command {
    SyncNow,
    Shutdown,
}

/// Drives the sync engine on a fixed interval and on demand.
///
/// One pass runs at a time, process-wide: the timer re-arms only after
/// a pass completes, and manual triggers that arrive while a pass is
/// running are coalesced into at most one trailing pass. Shutdown
/// cancels an in-flight pass at the next record boundary.
pub struct Scheduler {
    tx: Sender<Command>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the timer thread. `source` produces the records for each
    /// pass (loaded fresh, so records added or removed between passes
    /// are picked up); `on_pass` receives the synced records and their
    /// reports once per completed pass.
    pub fn start<S, F>(engine: SyncEngine, interval: Duration, mut source: S, mut on_pass: F) -> Self
    where
        S: FnMut() -> Vec<KeylistRecord> + Send + 'static,
        F: FnMut(Vec<KeylistRecord>, Vec<SyncReport>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let join = thread::spawn(move || {
            'outer: loop {
                match rx.recv_timeout(interval) {
                    Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                    Ok(Command::SyncNow) | Err(RecvTimeoutError::Timeout) => {}
                }
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                let records = source();
                let reports = engine.sync_all(&records, &stop_flag);
                on_pass(records, reports);

                // Drain triggers that piled up during the pass; they
                // asked for a sync that has now effectively happened.
                loop {
                    match rx.try_recv() {
                        Ok(Command::SyncNow) => {}
                        Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => break 'outer,
                        Err(TryRecvError::Empty) => break,
                    }
                }
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
            }
        });

        Self {
            tx,
            stop,
            join: Some(join),
        }
    }

    /// Request an immediate pass. A no-op if one is already running.
    pub fn sync_now(&self) {
        let _ = self.tx.send(Command::SyncNow);
    }

    /// Stop the timer and wait for the worker to exit.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Command::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.shutdown_inner();
        }
    }
}
