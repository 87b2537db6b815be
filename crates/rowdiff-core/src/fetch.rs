//! Keyed model fetches with stale-result dropping
//!
//! A fetch is identified by the commit and path set it was issued for. [`ModelStore`] hands out
//! monotonically numbered tickets and only ever applies the result of the newest one, keeping the
//! previous model on screen until that result lands. [`FetchWorker`] runs the host's
//! [`DiffSource`] and the parser on a background thread.

use crate::metadata::{parse_name_status, parse_numstat};
use crate::model::DiffModel;
use crate::parse::{parse_diff, ParseError};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("diff source failed for {commit_id}: {message}")]
    Source { commit_id: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch worker has stopped")]
    Disconnected,
}

/// What a fetch is for: a commit and a set of paths (empty = every path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FetchKey {
    pub commit_id: String,
    /// Sorted and deduplicated
    pub paths: Vec<String>,
}

impl FetchKey {
    pub fn new<I, S>(commit_id: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        paths.sort();
        paths.dedup();
        Self {
            commit_id: commit_id.into(),
            paths,
        }
    }
}

/// Handle for one issued fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    key: FetchKey,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &FetchKey {
        &self.key
    }
}

/// Raw text produced by a [`DiffSource`]
#[derive(Debug, Clone, Default)]
pub struct DiffInput {
    pub diff: String,
    /// `--name-status` style rename metadata
    pub name_status: Option<String>,
    /// `--numstat` style per-file counts
    pub numstat: Option<String>,
}

impl DiffInput {
    pub fn from_diff(diff: impl Into<String>) -> Self {
        Self {
            diff: diff.into(),
            ..Self::default()
        }
    }
}

/// Supplies diff text for a key
///
/// Implemented by the host; the engine never spawns processes itself.
pub trait DiffSource: Send + Sync {
    fn load(&self, key: &FetchKey) -> Result<DiffInput, FetchError>;
}

/// Load and parse a model synchronously
pub fn load_model(source: &dyn DiffSource, key: &FetchKey) -> Result<DiffModel, FetchError> {
    let input = source.load(key)?;
    let mut model = DiffModel::new(parse_diff(&input.diff)?);

    let names = input
        .name_status
        .as_deref()
        .map(parse_name_status)
        .unwrap_or_default();
    let stats = input
        .numstat
        .as_deref()
        .map(parse_numstat)
        .unwrap_or_default();
    if !names.is_empty() || !stats.is_empty() {
        model.apply_metadata(&names, &stats);
    }

    if !key.paths.is_empty() {
        model.retain_paths(&key.paths);
    }

    Ok(model)
}

/// The latest applied model plus the bookkeeping to reject stale results
#[derive(Debug, Default)]
pub struct ModelStore {
    model: Option<Arc<DiffModel>>,
    applied_key: Option<FetchKey>,
    issued: u64,
    pending: Option<FetchTicket>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `key`, superseding any in-flight fetch
    pub fn begin(&mut self, key: FetchKey) -> FetchTicket {
        self.issued += 1;
        let ticket = FetchTicket {
            generation: self.issued,
            key,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    fn is_latest(&self, ticket: &FetchTicket) -> bool {
        self.pending.as_ref() == Some(ticket)
    }

    /// Apply a finished fetch; false (and no change) when the ticket was superseded
    pub fn complete(&mut self, ticket: &FetchTicket, model: Arc<DiffModel>) -> bool {
        if !self.is_latest(ticket) {
            tracing::debug!(generation = ticket.generation, "dropping stale fetch result");
            return false;
        }
        tracing::debug!(
            generation = ticket.generation,
            commit = %ticket.key.commit_id,
            files = model.file_count(),
            "applying fetched model"
        );
        self.model = Some(model);
        self.applied_key = Some(ticket.key.clone());
        self.pending = None;
        true
    }

    /// Record a failed fetch; the previous model stays in place
    pub fn fail(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Route a worker outcome to [`ModelStore::complete`] or [`ModelStore::fail`]
    pub fn apply(&mut self, outcome: FetchOutcome) -> Result<bool, FetchError> {
        match outcome.result {
            Ok(model) => Ok(self.complete(&outcome.ticket, Arc::new(model))),
            Err(err) => {
                if self.fail(&outcome.ticket) {
                    Err(err)
                } else {
                    Ok(false)
                }
            }
        }
    }

    pub fn model(&self) -> Option<&Arc<DiffModel>> {
        self.model.as_ref()
    }

    /// Key of the currently applied model
    pub fn applied_key(&self) -> Option<&FetchKey> {
        self.applied_key.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// A fetch result coming back from the worker
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<DiffModel, FetchError>,
}

/// Background thread that loads and parses models
pub struct FetchWorker {
    requests: Option<Sender<FetchTicket>>,
    outcomes: Receiver<FetchOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn(source: Arc<dyn DiffSource>) -> Result<Self, FetchError> {
        let (request_tx, request_rx) = unbounded::<FetchTicket>();
        let (outcome_tx, outcome_rx) = unbounded();
        let worker = std::thread::Builder::new()
            .name("rowdiff-fetch".to_string())
            .spawn(move || fetch_loop(source, request_rx, outcome_tx))?;

        Ok(Self {
            requests: Some(request_tx),
            outcomes: outcome_rx,
            worker: Some(worker),
        })
    }

    pub fn request(&self, ticket: FetchTicket) -> Result<(), FetchError> {
        let tx = self.requests.as_ref().ok_or(FetchError::Disconnected)?;
        tx.send(ticket).map_err(|_| FetchError::Disconnected)
    }

    /// Next finished outcome, without blocking
    pub fn try_recv(&self) -> Option<FetchOutcome> {
        self.outcomes.try_recv().ok()
    }

    /// Next finished outcome, waiting up to `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<FetchOutcome>, FetchError> {
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(FetchError::Disconnected),
        }
    }

    /// Drain every finished outcome into `store`; true if a new model was applied
    ///
    /// Failures of the latest fetch are logged and leave the previous model in place.
    pub fn poll(&self, store: &mut ModelStore) -> bool {
        let mut applied = false;
        while let Some(outcome) = self.try_recv() {
            match store.apply(outcome) {
                Ok(swapped) => applied |= swapped,
                Err(err) => tracing::warn!(%err, "diff fetch failed, keeping previous model"),
            }
        }
        applied
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn fetch_loop(
    source: Arc<dyn DiffSource>,
    rx: Receiver<FetchTicket>,
    tx: Sender<FetchOutcome>,
) {
    for ticket in rx {
        let result = load_model(source.as_ref(), &ticket.key);
        if tx.send(FetchOutcome { ticket, result }).is_err() {
            break;
        }
    }
    tracing::debug!("fetch worker stopped");
}
