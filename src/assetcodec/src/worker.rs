//! Parallel worker offload (spec §5 "Parallel worker offload").
//!
//! A small request/response dispatch pool built on `std::thread` +
//! `std::sync::mpsc`/`Mutex`/`Condvar`: a caller submits a payload and
//! gets back a unique correlation id, then receives at most one
//! response carrying that same id, with either a result or an error
//! (spec §5 "submit a request containing a unique correlation id and a
//! payload; receive at most one response with the same id"). A request
//! moves its payload into the pool; the pool moves it back out in the
//! response rather than cloning it, so the move-in/move-out boundary
//! never copies bytes (spec §5 "must avoid byte copies when possible").
//!
//! One pool instance runs `worker_count` threads pulling from a single
//! shared queue, so requests are served in submission order per worker
//! but the pool as a whole is only as serial as it has workers (spec §5
//! "serialises requests per worker; callers that need concurrency
//! allocate multiple pool instances").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::error::{AssetError, Result};

/// Correlates a [`WorkerPool::submit`] call with its eventual response.
pub type CorrelationId = u64;

struct Envelope<Req> {
    id: CorrelationId,
    payload: Req,
}

/// A response carrying the same id as the request it answers.
pub struct WorkerResponse<Resp> {
    pub id: CorrelationId,
    pub result: Result<Resp>,
}

struct Shared<Req> {
    queue: Mutex<VecDeque<Envelope<Req>>>,
    not_empty: Condvar,
    terminated: AtomicBool,
}

/// A generic request/response dispatch pool (spec §5).
///
/// `Req`/`Resp` are whatever payload and result a given dispatchable
/// operation needs -- DAT parsing, SPR parsing, batch sprite
/// decompression, and OBD encode/decode are the four spec §5 names, and
/// each gets its own `WorkerPool<Req, Resp>` instantiation rather than
/// sharing one pool typed on an enum of all four, since a caller that
/// wants independent concurrency for two of them allocates two pools.
pub struct WorkerPool<Req, Resp> {
    shared: Arc<Shared<Req>>,
    response_tx: Sender<WorkerResponse<Resp>>,
    responses: Mutex<Option<Receiver<WorkerResponse<Resp>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl<Req, Resp> WorkerPool<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Spawns `worker_count` threads (minimum one) running `work`
    /// against requests pulled off one shared queue.
    pub fn new<F>(worker_count: usize, work: F) -> Self
    where
        F: Fn(Req) -> Result<Resp> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            terminated: AtomicBool::new(false),
        });
        let (response_tx, response_rx) = mpsc::channel();
        let work = Arc::new(work);

        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let shared = shared.clone();
            let response_tx = response_tx.clone();
            let work = work.clone();
            workers.push(std::thread::spawn(move || {
                worker_loop(&shared, &response_tx, work.as_ref());
            }));
        }

        WorkerPool {
            shared,
            response_tx,
            responses: Mutex::new(Some(response_rx)),
            workers: Mutex::new(workers),
            next_id: AtomicU64::new(0),
        }
    }

    /// Queues `payload`, returning the id its response will carry.
    /// Fails and hands `payload` back unclaimed once the pool has been
    /// [`terminate`](Self::terminate)d (spec §5 "terminated worker pool
    /// used").
    pub fn submit(&self, payload: Req) -> std::result::Result<CorrelationId, Req> {
        let mut queue = self.shared.queue.lock().unwrap();
        if self.shared.terminated.load(Ordering::SeqCst) {
            return Err(payload);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        queue.push_back(Envelope { id, payload });
        self.shared.not_empty.notify_one();
        Ok(id)
    }

    /// Blocks for the next available response, in completion order --
    /// a caller matches it against the [`CorrelationId`] it is waiting
    /// on. Returns `None` once every worker has exited and no more
    /// responses can ever arrive.
    pub fn recv(&self) -> Option<WorkerResponse<Resp>> {
        let guard = self.responses.lock().unwrap();
        guard.as_ref()?.recv().ok()
    }

    /// Terminates the pool (spec §5 "Terminating a worker pool rejects
    /// every still-pending request with a 'pool terminated' error").
    /// Requests already claimed by a worker finish and their real
    /// response is still delivered; requests still sitting in the queue
    /// are drained and each gets an [`AssetError::Resource`] response
    /// instead, so every id a caller `submit`ted still gets exactly one
    /// response. Blocks until every worker thread has joined, then
    /// hands back the response receiver so the caller can drain
    /// whatever arrived. A pool is meant to be terminated once; `submit`
    /// after this call always fails.
    pub fn terminate(&self) -> Receiver<WorkerResponse<Resp>> {
        let pending: Vec<_> = {
            let mut queue = self.shared.queue.lock().unwrap();
            self.shared.terminated.store(true, Ordering::SeqCst);
            let pending = queue.drain(..).collect();
            self.shared.not_empty.notify_all();
            pending
        };

        for envelope in pending {
            let _ = self.response_tx.send(WorkerResponse {
                id: envelope.id,
                result: Err(AssetError::Resource("terminated worker pool used")),
            });
        }

        for worker in self.workers.lock().unwrap().drain(..) {
            let _ = worker.join();
        }

        self.responses
            .lock()
            .unwrap()
            .take()
            .expect("a pool is only terminated once")
    }
}

fn worker_loop<Req, Resp>(
    shared: &Shared<Req>,
    response_tx: &Sender<WorkerResponse<Resp>>,
    work: &(dyn Fn(Req) -> Result<Resp> + Send + Sync),
) {
    loop {
        let envelope = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(envelope) = queue.pop_front() {
                    break Some(envelope);
                }
                if shared.terminated.load(Ordering::SeqCst) {
                    break None;
                }
                queue = shared.not_empty.wait(queue).unwrap();
            }
        };
        let Some(envelope) = envelope else { break };
        let result = work(envelope.payload);
        if response_tx.send(WorkerResponse { id: envelope.id, result }).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver as StdReceiver;
    use std::time::Duration;

    #[test]
    fn submit_and_recv_round_trip_a_moved_in_buffer() {
        let pool: WorkerPool<Vec<u8>, Vec<u8>> = WorkerPool::new(2, |mut buf| {
            buf.push(0xFF);
            Ok(buf)
        });

        let id = pool.submit(vec![1, 2, 3]).unwrap();
        let response = pool.recv().unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.result.unwrap(), vec![1, 2, 3, 0xFF]);

        pool.terminate();
    }

    #[test]
    fn worker_error_is_delivered_as_the_response_result() {
        let pool: WorkerPool<u32, u32> =
            WorkerPool::new(1, |_| Err(AssetError::format("worker_test", "boom")));

        pool.submit(7).unwrap();
        let response = pool.recv().unwrap();
        assert!(response.result.is_err());

        pool.terminate();
    }

    #[test]
    fn terminate_rejects_still_queued_requests_but_lets_in_flight_finish() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);

        let pool: WorkerPool<&'static str, &'static str> = WorkerPool::new(1, move |req| {
            if req == "first" {
                let rx: &StdReceiver<()> = &gate_rx.lock().unwrap();
                rx.recv().ok();
            }
            Ok(req)
        });

        let first_id = pool.submit("first").unwrap();
        // Give the lone worker a chance to claim "first" off the queue
        // before "second" is submitted behind it.
        std::thread::sleep(Duration::from_millis(50));
        let second_id = pool.submit("second").unwrap();

        gate_tx.send(()).unwrap();
        let responses = pool.terminate();

        let mut by_id = std::collections::HashMap::new();
        for response in responses {
            by_id.insert(response.id, response.result);
        }

        assert_eq!(by_id.remove(&first_id).unwrap().unwrap(), "first");
        assert!(by_id.remove(&second_id).unwrap().is_err());
    }

    #[test]
    fn submit_after_terminate_hands_the_payload_back() {
        let pool: WorkerPool<u32, u32> = WorkerPool::new(1, Ok);
        pool.submit(1).unwrap();
        let _ = pool.terminate();

        assert_eq!(pool.submit(99), Err(99));
    }
}
