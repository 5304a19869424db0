use std::{
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Instant,
};

use anyhow::{anyhow, Result};

use crate::{
    gemini::{EditRequest, GenerationError, ImageEditor},
    image_utils::GeneratedImage,
    session::{GenerationJob, JobOutcome},
};

/// Runs generation jobs on a background thread and hands back settled outcomes.
pub struct Dispatcher {
    job_tx: Sender<GenerationJob>,
    outcome_rx: Receiver<JobOutcome>,
    pub pending: usize,
}

impl Dispatcher {
    pub fn new(editor: Arc<dyn ImageEditor>) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<GenerationJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self::spawn_worker(editor, job_rx, outcome_tx);
        Self {
            job_tx,
            outcome_rx,
            pending: 0,
        }
    }

    fn spawn_worker(
        editor: Arc<dyn ImageEditor>,
        rx: Receiver<GenerationJob>,
        tx: Sender<JobOutcome>,
    ) {
        thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                let outcome = run_job(editor.as_ref(), job);
                if tx.send(outcome).is_err() {
                    break;
                }
            }
        });
    }

    pub fn dispatch(&mut self, job: GenerationJob) -> Result<()> {
        log::info!(
            "dispatching {:?} with {} request(s)",
            job.kind,
            job.requests.len()
        );
        self.job_tx
            .send(job)
            .map_err(|e| anyhow!("Failed to send generation job: {}", e))?;
        self.pending += 1;
        Ok(())
    }

    pub fn check_completions(&mut self) -> Vec<JobOutcome> {
        let mut completed = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            completed.push(outcome);
        }
        completed
    }
}

/// Runs every request of `job` and waits for all of them to settle.
///
/// Requests run concurrently, one thread each. A failing or panicking request only
/// affects its own entry; results come back in request order.
pub fn run_job(editor: &dyn ImageEditor, job: GenerationJob) -> JobOutcome {
    let start = Instant::now();
    let results = run_all_settled(editor, &job.requests);
    let failed = results.iter().filter(|r| r.is_err()).count();
    log::info!(
        "{:?} settled in {:?}: {} ok, {} failed",
        job.kind,
        start.elapsed(),
        results.len() - failed,
        failed
    );
    JobOutcome {
        epoch: job.epoch,
        kind: job.kind,
        results,
    }
}

pub fn run_all_settled(
    editor: &dyn ImageEditor,
    requests: &[EditRequest],
) -> Vec<Result<GeneratedImage, GenerationError>> {
    thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .enumerate()
            .map(|(index, request)| scope.spawn(move || run_one(editor, index, request)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                handle.join().unwrap_or_else(|_| {
                    log::error!("edit worker {index} panicked");
                    Err(GenerationError::WorkerPanicked)
                })
            })
            .collect()
    })
}

fn run_one(
    editor: &dyn ImageEditor,
    index: usize,
    request: &EditRequest,
) -> Result<GeneratedImage, GenerationError> {
    let result = editor.edit(request);
    match &result {
        Ok(image) => log::debug!(
            "request {index} returned {} bytes ({})",
            image.bytes.len(),
            image.mime
        ),
        Err(err) if err.is_denial() => log::warn!("request {index} denied: {err}"),
        Err(err) => log::warn!("request {index} failed: {err}"),
    }
    result
}
