//! A fixed pool of long-lived worker threads, each running tournament
//! evaluations on demand, following the same `Command`/`Report`
//! channel-pair shape as a search-engine thread pool, generalized from
//! "run a search to this depth" to "evaluate this ruleset".

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::error::WorkerError;
use crate::ruleset::Ruleset;
use crate::tournament::{evaluate_ruleset, TournamentResult};

/// A command sent to a worker thread.
pub enum Command {
    /// Requests a tournament evaluation of `ruleset`.
    Evaluate { task_id: u64, ruleset: Ruleset, base_depth: u8, base_seed: u64, reduced: bool },

    /// Stops the worker thread.
    Shutdown,
}

/// A report sent back from a worker thread.
pub enum Report {
    /// The evaluation for `task_id` completed.
    Done { task_id: u64, result: TournamentResult },

    /// The evaluation for `task_id` failed inside the worker.
    Failed { task_id: u64, error: WorkerError },
}

fn run(worker_id: usize, commands: Receiver<Command>, reports: Sender<Report>) {
    loop {
        let command = match commands.recv() {
            Ok(cmd) => cmd,
            Err(_) => break,
        };

        match command {
            Command::Evaluate { task_id, ruleset, base_depth, base_seed, reduced } => {
                let signature = ruleset.signature();
                tracing::debug!(worker_id, task_id, signature = %signature, base_depth, "evaluating ruleset");
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    evaluate_ruleset(&ruleset, base_depth, base_seed, reduced)
                }));
                let report = match outcome {
                    Ok(result) => Report::Done { task_id, result },
                    Err(payload) => {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "worker panicked with a non-string payload".into());
                        tracing::warn!(worker_id, task_id, signature = %signature, message, "worker task panicked");
                        Report::Failed { task_id, error: WorkerError::Panicked { signature, message } }
                    }
                };
                // The master may have dropped its report receiver (e.g. during
                // shutdown); that's not this worker's problem.
                reports.send(report).ok();
            }
            Command::Shutdown => {
                let _ = worker_id;
                break;
            }
        }
    }
}

/// A fixed pool of worker threads. Each worker owns its own command
/// channel; `submit` round-robins across them and falls back to the next
/// live worker if one has disconnected, so a crashed worker only costs its
/// own in-flight task.
pub struct WorkerPool {
    command_txs: Vec<Option<Sender<Command>>>,
    report_rx: Receiver<Report>,
    workers: Vec<JoinHandle<()>>,
    next_worker: usize,
}

impl WorkerPool {
    /// Spawns `n_workers` long-lived threads (at least one).
    pub fn new(n_workers: usize) -> WorkerPool {
        let n_workers = n_workers.max(1);
        let (report_tx, report_rx) = mpsc::channel();
        let mut command_txs = Vec::with_capacity(n_workers);
        let mut workers = Vec::with_capacity(n_workers);

        for worker_id in 0..n_workers {
            let (command_tx, command_rx) = mpsc::channel();
            let reports = report_tx.clone();
            workers.push(thread::spawn(move || run(worker_id, command_rx, reports)));
            command_txs.push(Some(command_tx));
        }

        WorkerPool { command_txs, report_rx, workers, next_worker: 0 }
    }

    /// Picks a worker count from `worker_count` if given, otherwise runs
    /// `probe_worker_count` against `sample_throughput` (see its docs).
    pub fn sized_for(worker_count: Option<usize>, sample_throughput: impl FnMut(usize) -> f64) -> WorkerPool {
        let n = worker_count.unwrap_or_else(|| probe_worker_count(64, sample_throughput));
        WorkerPool::new(n)
    }

    /// Sends `command` to the next live worker in round-robin order,
    /// skipping over any worker whose channel has disconnected.
    pub fn submit(&mut self, mut command: Command) {
        let n = self.command_txs.len();
        for offset in 0..n {
            let idx = (self.next_worker + offset) % n;
            let Some(tx) = &self.command_txs[idx] else { continue };
            match tx.send(command) {
                Ok(()) => {
                    self.next_worker = (idx + 1) % n;
                    return;
                }
                Err(mpsc::SendError(returned)) => {
                    self.command_txs[idx] = None;
                    command = returned;
                }
            }
        }
        // Every worker has disconnected; nothing more we can do with this
        // command. The caller will eventually stop seeing reports for it.
    }

    /// Non-blocking receive of the next available report.
    pub fn try_recv(&self) -> Option<Report> {
        self.report_rx.try_recv().ok()
    }

    /// Blocks until a report is available, or returns `None` once every
    /// worker has exited and no report is pending.
    pub fn recv(&self) -> Option<Report> {
        self.report_rx.recv().ok()
    }

    /// Tells every live worker to stop, then joins all threads.
    pub fn shutdown(mut self) {
        for tx in self.command_txs.iter_mut().flatten() {
            tx.send(Command::Shutdown).ok();
        }
        for handle in self.workers.drain(..) {
            handle.join().ok();
        }
    }
}

/// Doubles the worker count starting from 1 while the marginal
/// games/sec throughput gain from one more doubling exceeds 5%, capped at
/// `max_workers`. `sample_throughput(n)` reports measured throughput for
/// `n` workers; injected so this stays a pure, deterministically testable
/// function rather than one that spawns real threads and times real games.
pub fn probe_worker_count(max_workers: usize, mut sample_throughput: impl FnMut(usize) -> f64) -> usize {
    const GAIN_THRESHOLD: f64 = 0.05;
    let max_workers = max_workers.max(1);

    let mut workers = 1usize;
    let mut throughput = sample_throughput(workers);
    while workers * 2 <= max_workers {
        let candidate = workers * 2;
        let candidate_throughput = sample_throughput(candidate);
        if throughput <= 0.0 {
            break;
        }
        let gain = (candidate_throughput - throughput) / throughput;
        if gain <= GAIN_THRESHOLD {
            break;
        }
        workers = candidate;
        throughput = candidate_throughput;
    }
    workers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::PieceId;
    use crate::template::TemplateId;

    fn tiny_ruleset() -> Ruleset {
        Ruleset {
            white_king: PieceId("K1"),
            white_pieces: vec![PieceId("A1"); 8],
            black_king: PieceId("K1"),
            black_pieces: vec![PieceId("A1"); 8],
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: None,
            black_positions: None,
            white_facings: None,
            black_facings: None,
            name: None,
        }
    }

    #[test]
    fn pool_evaluates_and_reports_done() {
        let mut pool = WorkerPool::new(2);
        pool.submit(Command::Evaluate {
            task_id: 1,
            ruleset: tiny_ruleset(),
            base_depth: 2,
            base_seed: 7,
            reduced: true,
        });
        match pool.recv() {
            Some(Report::Done { task_id, .. }) => assert_eq!(task_id, 1),
            other => panic!("expected Done report, got a different report or none: {}", other.is_some()),
        }
        pool.shutdown();
    }

    #[test]
    fn probe_stops_doubling_once_gain_falls_below_threshold() {
        // Throughput doubles up to 4 workers, then plateaus.
        let throughput = |n: usize| -> f64 {
            match n {
                1 => 10.0,
                2 => 20.0,
                4 => 39.0,
                8 => 40.0,
                _ => 40.0,
            }
        };
        assert_eq!(probe_worker_count(64, throughput), 4);
    }

    #[test]
    fn probe_never_exceeds_the_max_worker_cap() {
        let always_doubling = |n: usize| -> f64 { n as f64 * 2.0 };
        assert_eq!(probe_worker_count(8, always_doubling), 8);
    }

    #[test]
    fn probe_stays_at_one_when_doubling_never_pays_off() {
        let flat = |_n: usize| -> f64 { 10.0 };
        assert_eq!(probe_worker_count(16, flat), 1);
    }

    #[test]
    fn a_disconnected_worker_is_skipped_on_resubmit() {
        let mut pool = WorkerPool::new(2);
        // Force worker 0 to exit by sending it a direct shutdown, bypassing
        // round-robin, then confirm a later submit still gets served.
        if let Some(tx) = &pool.command_txs[0] {
            tx.send(Command::Shutdown).ok();
        }
        // Give the worker thread a beat to actually exit and drop its end.
        std::thread::yield_now();
        pool.submit(Command::Evaluate {
            task_id: 2,
            ruleset: tiny_ruleset(),
            base_depth: 2,
            base_seed: 3,
            reduced: true,
        });
        assert!(pool.recv().is_some());
        pool.shutdown();
    }
}
