//! Sharded Batch Scoring
//!
//! Records are routed to worker threads by `xxh3(user_id) % shards`, so one
//! user's transactions always land on the same worker. Every worker reads
//! the same frozen model. Results carry their input index and are
//! reassembled in input order, which makes the output identical to a
//! sequential pass.

use crate::error::CliError;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use sentinel_core::{BatchPrediction, FraudModel, PredictionError, TransactionRecord};
use std::thread;
use tracing::debug;

/// Per-shard queue depth
const QUEUE_DEPTH: usize = 1024;

struct Job {
    index: usize,
    record: TransactionRecord,
}

type Outcome = (usize, Result<BatchPrediction, PredictionError>);

/// Shard owning a share of the batch
struct ShardWorker {
    id: usize,
    model: FraudModel,
    rx: Receiver<Job>,
    results: Sender<Outcome>,
}

impl ShardWorker {
    fn spawn(
        id: usize,
        model: FraudModel,
        rx: Receiver<Job>,
        results: Sender<Outcome>,
    ) -> Result<thread::JoinHandle<()>, CliError> {
        thread::Builder::new()
            .name(format!("sentinel-shard-{}", id))
            .spawn(move || {
                let worker = ShardWorker {
                    id,
                    model,
                    rx,
                    results,
                };
                worker.run();
            })
            .map_err(|e| CliError::Worker(format!("cannot spawn shard {}: {}", id, e)))
    }

    fn run(self) {
        let mut scored = 0usize;
        while let Ok(job) = self.rx.recv() {
            let outcome = self
                .model
                .assess(&job.record)
                .map(|a| BatchPrediction::from_assessment(job.record.user_id, a));
            if self.results.send((job.index, outcome)).is_err() {
                break;
            }
            scored += 1;
        }
        debug!(shard = self.id, scored, "Shard worker stopped");
    }
}

/// Shard a user id lands on
pub fn shard_index(user_id: &str, shards: usize) -> usize {
    let hash = xxhash_rust::xxh3::xxh3_64(user_id.as_bytes());
    (hash % shards.max(1) as u64) as usize
}

/// Fan-out scorer for large batches
#[derive(Debug, Clone)]
pub struct ShardPool {
    model: FraudModel,
    shards: usize,
}

impl ShardPool {
    pub fn new(model: FraudModel, shards: usize) -> Self {
        Self {
            model,
            shards: shards.max(1),
        }
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    /// Score every record; output order follows input order
    pub fn score(&self, records: &[TransactionRecord]) -> Result<Vec<BatchPrediction>, CliError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let (result_tx, result_rx) = unbounded::<Outcome>();
        let mut senders: Vec<Sender<Job>> = Vec::with_capacity(self.shards);
        let mut handles = Vec::with_capacity(self.shards);

        for id in 0..self.shards {
            let (tx, rx) = bounded::<Job>(QUEUE_DEPTH);
            handles.push(ShardWorker::spawn(id, self.model.clone(), rx, result_tx.clone())?);
            senders.push(tx);
        }
        drop(result_tx);

        for (index, record) in records.iter().enumerate() {
            let shard = shard_index(&record.user_id, self.shards);
            senders[shard]
                .send(Job {
                    index,
                    record: record.clone(),
                })
                .map_err(|_| CliError::Worker(format!("shard {} stopped accepting work", shard)))?;
        }
        // Closing the queues lets workers drain and exit
        drop(senders);

        let mut slots: Vec<Option<BatchPrediction>> = vec![None; records.len()];
        let mut first_error: Option<PredictionError> = None;
        for (index, outcome) in result_rx.iter() {
            match outcome {
                Ok(prediction) => slots[index] = Some(prediction),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        for (id, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| CliError::Worker(format!("shard {} panicked", id)))?;
        }

        if let Some(e) = first_error {
            return Err(e.into());
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| CliError::Worker(format!("no result for record {}", index)))
            })
            .collect()
    }
}
