//! Event bus connecting vault lifecycle notifications to their sync
//! handlers.
//!
//! Events are consumed strictly one at a time in arrival order, so a batch
//! of dropped files is never interleaved with a deletion and upload bursts
//! stay sequential.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// One host-delivered file: a basename, its full content, and where it
/// currently sits on disk (when it sits anywhere at all).
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingFile {
    pub name: String,
    pub content: Vec<u8>,
    pub source_path: Option<PathBuf>,
}

/// Something happened in the vault that the sync layer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum VaultEvent {
    /// A file was deleted locally. Carries the basename only.
    Deleted { name: String },
    /// Files were dropped into the vault.
    Dropped { files: Vec<IncomingFile> },
    /// Files were pasted into the vault.
    Pasted { files: Vec<IncomingFile> },
}

/// Event kinds handlers register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deleted,
    Dropped,
    Pasted,
}

impl VaultEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VaultEvent::Deleted { .. } => EventKind::Deleted,
            VaultEvent::Dropped { .. } => EventKind::Dropped,
            VaultEvent::Pasted { .. } => EventKind::Pasted,
        }
    }
}

pub type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type EventHandler = Box<dyn FnMut(VaultEvent) -> BoxedFuture + Send>;

/// Sending half of the bus. Cheap to clone; both an async `send` and a
/// `blocking_send` for plain-thread producers like the file watcher.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<VaultEvent>,
}

impl EventSender {
    pub async fn send(&self, event: VaultEvent) -> Result<(), mpsc::error::SendError<VaultEvent>> {
        self.tx.send(event).await
    }

    pub fn blocking_send(
        &self,
        event: VaultEvent,
    ) -> Result<(), mpsc::error::SendError<VaultEvent>> {
        self.tx.blocking_send(event)
    }
}

/// Receives events and dispatches each to the handler registered for its
/// kind. Each handler runs to completion before the next event is taken.
pub struct EventBus {
    handlers: HashMap<EventKind, EventHandler>,
    rx: mpsc::Receiver<VaultEvent>,
}

impl EventBus {
    pub fn new() -> (EventSender, EventBus) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            EventSender { tx },
            EventBus {
                handlers: HashMap::new(),
                rx,
            },
        )
    }

    /// Register the handler for one event kind, replacing any previous one.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(VaultEvent) -> BoxedFuture + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Consume events until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            let kind = event.kind();
            match self.handlers.get_mut(&kind) {
                Some(handler) => handler(event).await,
                None => {
                    debug!("no handler registered for {:?} event, dropping it", kind);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn incoming(name: &str) -> IncomingFile {
        IncomingFile {
            name: name.to_string(),
            content: b"data".to_vec(),
            source_path: None,
        }
    }

    #[test]
    fn event_kinds_map() {
        assert_eq!(
            VaultEvent::Deleted {
                name: "a.md".to_string()
            }
            .kind(),
            EventKind::Deleted
        );
        assert_eq!(
            VaultEvent::Dropped { files: vec![] }.kind(),
            EventKind::Dropped
        );
        assert_eq!(
            VaultEvent::Pasted { files: vec![] }.kind(),
            EventKind::Pasted
        );
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler_in_order() {
        let (sender, mut bus) = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handler_seen = seen.clone();
        bus.on(EventKind::Deleted, move |event| {
            let seen = handler_seen.clone();
            Box::pin(async move {
                if let VaultEvent::Deleted { name } = event {
                    seen.lock().unwrap().push(name);
                }
            })
        });

        sender
            .send(VaultEvent::Deleted {
                name: "a.md".to_string(),
            })
            .await
            .unwrap();
        sender
            .send(VaultEvent::Deleted {
                name: "b.md".to_string(),
            })
            .await
            .unwrap();
        drop(sender);

        bus.run().await;
        assert_eq!(*seen.lock().unwrap(), vec!["a.md", "b.md"]);
    }

    #[tokio::test]
    async fn events_without_handler_are_dropped() {
        let (sender, bus) = EventBus::new();

        sender
            .send(VaultEvent::Dropped {
                files: vec![incoming("x.pdf")],
            })
            .await
            .unwrap();
        drop(sender);

        // Completes without panicking even though nothing was registered.
        bus.run().await;
    }

    #[tokio::test]
    async fn handlers_never_overlap() {
        let (sender, mut bus) = EventBus::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let handler_active = active.clone();
        let handler_max = max_active.clone();
        bus.on(EventKind::Dropped, move |_event| {
            let active = handler_active.clone();
            let max_active = handler_max.clone();
            Box::pin(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
        });

        for _ in 0..4 {
            sender
                .send(VaultEvent::Dropped {
                    files: vec![incoming("f.bin")],
                })
                .await
                .unwrap();
        }
        drop(sender);

        bus.run().await;
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }
}
