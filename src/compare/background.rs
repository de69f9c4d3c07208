use std::{
    sync::{mpsc, Arc},
    thread::JoinHandle,
};

use tracing::debug;

use crate::{
    compare::{ComparisonOutput, ComparisonRequest, ComparisonTask},
    config::Settings,
    control::TaskControl,
    error::{Error, Result},
    map::MeshblockLayer,
    scenario::ScenarioRegistry,
};

/// A comparison running on a background thread.
///
/// Dropping the handle cancels the comparison.
#[derive(Debug)]
pub struct ComparisonHandle {
    request: ComparisonRequest,
    control: TaskControl,
    receiver: mpsc::Receiver<Result<ComparisonOutput>>,
    thread: Option<JoinHandle<()>>,
}

impl ComparisonHandle {
    #[inline] pub fn request(&self) -> &ComparisonRequest { &self.request }

    /// Ask the worker to stop at its next checkpoint.
    #[inline] pub fn cancel(&self) { self.control.cancel() }

    /// Progress percentage reported by the worker.
    #[inline] pub fn progress(&self) -> f64 { self.control.progress() }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// The result, if the worker has finished. Returns `None` while running.
    pub fn try_result(&mut self) -> Option<Result<ComparisonOutput>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.reap();
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(self.lost())),
        }
    }

    /// Block until the worker finishes.
    pub fn join(mut self) -> Result<ComparisonOutput> {
        let result = self.receiver.recv().map_err(|_| self.lost())?;
        self.reap();
        result
    }

    fn reap(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn lost(&mut self) -> Error {
        let panicked = self.thread.take().is_some_and(|thread| thread.join().is_err());
        Error::Worker(if panicked { "comparison worker panicked" } else { "comparison worker exited without a result" }.to_string())
    }
}

impl Drop for ComparisonHandle {
    fn drop(&mut self) { self.control.cancel() }
}

/// Start a comparison on a new thread over shared snapshots of the
/// registry and meshblock layer.
pub fn spawn_comparison(
    registry: Arc<ScenarioRegistry>,
    meshblocks: Arc<MeshblockLayer>,
    request: ComparisonRequest,
    settings: &Settings,
) -> Result<ComparisonHandle> {
    let task = ComparisonTask::new(request, settings);
    let control = TaskControl::new();
    let worker = control.clone();
    let (sender, receiver) = mpsc::channel();

    let thread = std::thread::Builder::new()
        .name(String::from("scenario-comparison"))
        .spawn(move || {
            let result = task.run(&registry, &meshblocks, &worker);
            if let Err(e) = &result { debug!("comparison ended with error: {e}") }
            let _ = sender.send(result);
        })?;

    Ok(ComparisonHandle { request, control, receiver, thread: Some(thread) })
}
