//! Actor owning the JSON document file.
//!
//! Every store operation is one read-modify-write transaction over the whole
//! document. Routing them through a single actor keeps concurrent requests
//! from interleaving their reads and writes.

use crate::error::LeafError;
use crate::types::{Collection, Plant, User};

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// On-disk layout: `{ "users": [], "plants": [], "collections": [] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeafDocument {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl LeafDocument {
    /// Drop collection entries pointing at plants that no longer exist.
    /// Returns whether anything changed.
    pub fn prune_dangling(&mut self) -> bool {
        let existing: HashSet<&str> = self.plants.iter().map(|p| p.id.as_str()).collect();
        let mut changed = false;
        for collection in &mut self.collections {
            let before = collection.plant_ids.len();
            collection
                .plant_ids
                .retain(|id| existing.contains(id.as_str()));
            changed |= collection.plant_ids.len() != before;
        }
        changed
    }
}

/// A transaction returns `true` when the document must be written back.
pub type Transaction = Box<dyn FnOnce(&mut LeafDocument) -> bool + Send>;

pub enum JsonFileMessage {
    Transact(Transaction, RpcReplyPort<Result<(), LeafError>>),
}

impl fmt::Debug for JsonFileMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonFileMessage::Transact(..) => f.write_str("Transact"),
        }
    }
}

/// Handle for submitting transactions to the file actor.
#[derive(Clone)]
pub struct JsonFileHandle {
    actor: ActorRef<JsonFileMessage>,
}

impl JsonFileHandle {
    /// Run `f` against the current document; the boolean it returns decides
    /// whether the document is persisted afterwards.
    pub async fn transact<T, F>(&self, f: F) -> Result<T, LeafError>
    where
        T: Send + 'static,
        F: FnOnce(&mut LeafDocument) -> (T, bool) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Transaction = Box::new(move |doc| {
            let (out, dirty) = f(doc);
            let _ = tx.send(out);
            dirty
        });

        ractor::call!(self.actor, JsonFileMessage::Transact, job)
            .map_err(|e| LeafError::RactorError(format!("Transact RPC failed: {e}")))??;

        rx.await
            .map_err(|e| LeafError::RactorError(format!("transaction result dropped: {e}")))
    }

    /// Read-only transaction.
    pub async fn read<T, F>(&self, f: F) -> Result<T, LeafError>
    where
        T: Send + 'static,
        F: FnOnce(&LeafDocument) -> T + Send + 'static,
    {
        self.transact(move |doc| (f(doc), false)).await
    }
}

struct JsonFileState {
    path: PathBuf,
}

struct JsonFileActor;

#[ractor::async_trait]
impl Actor for JsonFileActor {
    type Msg = JsonFileMessage;
    type State = JsonFileState;
    type Arguments = PathBuf;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        path: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        if !path.exists() {
            save(&path, &LeafDocument::default())
                .await
                .map_err(|e| ActorProcessingErr::from(format!("json store init failed: {e}")))?;
            info!(path = %path.display(), "created empty json store");
        }
        Ok(JsonFileState { path })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            JsonFileMessage::Transact(job, reply) => {
                let result = run(&state.path, job).await;
                let _ = reply.send(result);
            }
        }
        Ok(())
    }
}

async fn run(path: &Path, job: Transaction) -> Result<(), LeafError> {
    let mut doc = load(path).await?;
    if job(&mut doc) {
        save(path, &doc).await?;
        debug!(path = %path.display(), "json store written");
    }
    Ok(())
}

async fn load(path: &Path) -> Result<LeafDocument, LeafError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LeafDocument::default()),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(LeafDocument::default());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write to a sibling temp file, then rename it into place.
async fn save(path: &Path, doc: &LeafDocument) -> Result<(), LeafError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Spawn the file actor for `path` and return a handle.
pub async fn spawn(path: PathBuf) -> Result<JsonFileHandle, LeafError> {
    let (actor, _jh) = Actor::spawn(None, JsonFileActor, path)
        .await
        .map_err(|e| LeafError::RactorError(format!("failed to spawn JsonFileActor: {e}")))?;
    Ok(JsonFileHandle { actor })
}
