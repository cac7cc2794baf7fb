//! A tiny job queue: give it jobs from the main loop, it runs a worker
//! closure on a dedicated background thread, and the main loop drains
//! completed results on its own cadence. This is the one primitive every
//! backend in this crate uses to keep blocking I/O off the main thread
//! (spec.md §5): the live-protocol reader, HTTP ingest, weather lookups, and
//! RPC calls are all `Request<T, J>` underneath.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread;

/// `T` is the result type delivered back to the main loop; `J` is the job
/// type sent to the worker. Jobs and results each travel over their own
/// bounded channel so a slow consumer can't make the worker block forever.
pub struct Request<T, J> {
    job_tx: Option<Sender<J>>,
    result_rx: Option<Receiver<T>>,
    capacity: usize,
}

impl<T, J> Request<T, J>
where
    T: Send + 'static,
    J: Send + 'static,
{
    /// `capacity` bounds both channels; a backed-up worker applies
    /// backpressure to `give_job` rather than growing without limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            job_tx: None,
            result_rx: None,
            capacity,
        }
    }

    /// Spawns the worker thread. `worker` is called once per job, on the
    /// background thread; its return value is handed back on `get_next`.
    pub fn run<F>(&mut self, worker: F)
    where
        F: Fn(J) -> T + Send + 'static,
    {
        let (job_tx, job_rx) = bounded::<J>(self.capacity);
        let (result_tx, result_rx) = bounded::<T>(self.capacity);

        thread::spawn(move || {
            for job in job_rx.iter() {
                let result = worker(job);
                // The main loop may have stopped polling (e.g. backend
                // swapped out); dropping the result here is fine, spec.md §5
                // says an in-flight request is allowed to run to completion
                // and its result is simply dropped.
                let _ = result_tx.send(result);
            }
        });

        self.job_tx = Some(job_tx);
        self.result_rx = Some(result_rx);
    }

    pub fn give_job(&self, job: J) {
        if let Some(tx) = &self.job_tx {
            // Non-blocking: a full queue drops the job rather than stalling
            // the main loop.
            let _ = tx.try_send(job);
        }
    }

    pub fn get_next(&self) -> Option<T> {
        self.result_rx.as_ref()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn round_trips_a_job_through_the_worker() {
        let mut req: Request<i32, i32> = Request::new(4);
        req.run(|job| job * 2);
        req.give_job(21);

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut result = None;
        while Instant::now() < deadline {
            if let Some(r) = req.get_next() {
                result = Some(r);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(result, Some(42));
    }
}
