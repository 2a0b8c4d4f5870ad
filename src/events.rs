//! Ledger notifications.
//!
//! Every successful mutation emits one [`VaultEvent`]. The log is
//! append-only and can forward a copy of each event to pluggable sinks
//! (a JSON-lines file, a test collector, an indexer).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::Identity;

/// A sink that receives ledger events.
pub trait EventSink: Send {
    /// Called once for every emitted event, in emission order.
    fn append(&mut self, event: VaultEvent);
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEventKind {
    VaultCreated,
    VaultKeyRotated,
    /// A secret was appended at `index`.
    SecretStored { index: usize },
}

/// A notification emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    /// The owner whose vault changed.
    pub owner: Identity,
    #[serde(flatten)]
    pub kind: VaultEventKind,
    pub timestamp: DateTime<Utc>,
}

impl VaultEvent {
    pub(crate) fn now(owner: Identity, kind: VaultEventKind) -> Self {
        Self {
            owner,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only record of emitted events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VaultEvent> {
        self.events.iter()
    }
}

/// Sinks that receive a copy of every event.
///
/// Kept apart from the ledger state: sinks run after the state lock is
/// released, so they may read the ledger and may block.
#[derive(Default)]
pub struct EventSinks {
    sinks: Vec<Box<dyn EventSink>>,
}

impl std::fmt::Debug for EventSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSinks")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSinks {
    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Hand `event` to every sink, in the order they were added.
    pub fn forward(&mut self, event: &VaultEvent) {
        for sink in self.sinks.iter_mut() {
            sink.append(event.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes events as JSON lines to a file, creating it if needed.
pub struct FileEventSink {
    file: std::fs::File,
}

impl FileEventSink {
    /// Open or create `path` for appending.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl EventSink for FileEventSink {
    fn append(&mut self, event: VaultEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "event not serialized");
                return;
            }
        };
        if let Err(err) = writeln!(self.file, "{line}").and_then(|_| self.file.flush()) {
            warn!(%err, "event not written to file sink");
        }
    }
}
