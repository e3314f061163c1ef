//! Background commit-message generation.
//!
//! The interactive thread owns a `GenerationController`. At most one generation
//! runs at a time: the controller holds a single slot for the worker's handle,
//! and a dispatch while the slot is taken is refused on the spot. Workers never
//! touch controller state; they send their result over a channel that the
//! controller drains when the interactive thread polls it.

use crate::generate::{GenerateError, MessageGenerator, Provider};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("a commit message is already being generated, please wait")]
    AlreadyGenerating,

    #[error("failed to start generation worker: {0}")]
    Spawn(String),
}

pub type GenerationResult = Result<String, GenerateError>;

struct GenerationEvent {
    id: u64,
    result: GenerationResult,
}

struct PendingGeneration {
    id: u64,
    handle: JoinHandle<()>,
}

pub struct GenerationController {
    generator: Arc<dyn MessageGenerator>,
    slot: Option<PendingGeneration>,
    next_id: u64,
    tx: Sender<GenerationEvent>,
    rx: Receiver<GenerationEvent>,
}

impl GenerationController {
    pub fn new(generator: Arc<dyn MessageGenerator>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            generator,
            slot: None,
            next_id: 0,
            tx,
            rx,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.slot.is_some()
    }

    /// start generating a message for `diff` on a worker thread
    pub fn dispatch(&mut self, diff: String, provider: Provider) -> Result<(), ControllerError> {
        if self.slot.is_some() {
            return Err(ControllerError::AlreadyGenerating);
        }

        let id = self.next_id;
        self.next_id += 1;
        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        let handle = thread::Builder::new()
            .name("generate".to_string())
            .spawn(move || {
                let result = generator.generate(&diff, provider);
                let _ = tx.send(GenerationEvent { id, result });
            })
            .map_err(|e| ControllerError::Spawn(e.to_string()))?;

        self.slot = Some(PendingGeneration { id, handle });
        Ok(())
    }

    /// collect the outstanding result, if it has arrived
    ///
    /// the slot is freed whenever a result is returned, success or not; a worker
    /// that died without reporting counts as a failure
    pub fn poll(&mut self) -> Option<GenerationResult> {
        let pending_id = self.slot.as_ref()?.id;
        // checked before draining: a worker sends before it finishes, so a
        // finished worker's result is already in the channel
        let finished = self
            .slot
            .as_ref()
            .is_some_and(|pending| pending.handle.is_finished());

        while let Ok(event) = self.rx.try_recv() {
            if event.id == pending_id {
                self.release();
                return Some(event.result);
            }
        }

        if finished {
            self.release();
            return Some(Err(GenerateError::WorkerLost));
        }
        None
    }

    /// block until the outstanding generation reports, checking every `tick`
    pub fn wait(&mut self, tick: Duration) -> Option<GenerationResult> {
        while self.is_generating() {
            if let Some(result) = self.poll() {
                return Some(result);
            }
            thread::sleep(tick);
        }
        None
    }

    fn release(&mut self) {
        if let Some(pending) = self.slot.take() {
            let _ = pending.handle.join();
        }
    }
}
