//! Filesystem watcher that turns sync-directory changes into vault events.
//!
//! New files become `Dropped` events and removed files become `Deleted`
//! events. Names already known to the bridge are skipped, so edits to an
//! existing file never trigger a second upload.

use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::{EventSender, IncomingFile, VaultEvent};

const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Start watching the sync directory and forward changes into the bus.
///
/// `known_names` seeds the set of files treated as already present;
/// callers pass the directory listing taken at startup.
pub async fn start_vault_watcher(
    sync_dir: PathBuf,
    known_names: HashSet<String>,
    events: EventSender,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(100);

    // Spawn blocking file watcher in separate thread
    let watch_dir = sync_dir.clone();
    std::thread::spawn(move || {
        if let Err(e) = run_file_watcher(watch_dir, tx) {
            warn!(target: "vaultdrive::watch", "vault watcher stopped: {}", e);
        }
    });

    tokio::spawn(forward_events(sync_dir, known_names, rx, events));

    Ok(())
}

fn run_file_watcher(watch_dir: PathBuf, tx: mpsc::Sender<Event>) -> Result<()> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )?;

    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch directory: {}", watch_dir.display()))?;

    // Keep watcher alive
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

async fn forward_events(
    sync_dir: PathBuf,
    mut known_names: HashSet<String>,
    mut rx: mpsc::Receiver<Event>,
    events: EventSender,
) {
    info!(
        target: "vaultdrive::watch",
        "watching {}", sync_dir.display()
    );

    while let Some(event) = rx.recv().await {
        for signal in classify(&event) {
            match signal {
                WatchSignal::Arrived(path) => {
                    handle_arrival(&mut known_names, path, &events).await;
                }
                WatchSignal::Removed(path) => {
                    handle_removal(&mut known_names, &path, &events).await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchSignal {
    Arrived(PathBuf),
    Removed(PathBuf),
}

fn classify(event: &Event) -> Vec<WatchSignal> {
    match &event.kind {
        EventKind::Create(_) => arrivals(event),
        // File was closed after writing (editors that write in place)
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => arrivals(event),
        // Atomic writes (vim, etc.) land as renames
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => arrivals(event),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => removals(event),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut signals = Vec::new();
            if let Some(old) = event.paths.first() {
                signals.push(WatchSignal::Removed(old.clone()));
            }
            if let Some(new) = event.paths.get(1) {
                signals.push(WatchSignal::Arrived(new.clone()));
            }
            signals
        }
        EventKind::Modify(ModifyKind::Name(_)) => by_existence(event),
        EventKind::Remove(_) => removals(event),
        // Plain content edits never re-upload; uploads are create-only.
        _ => Vec::new(),
    }
}

fn arrivals(event: &Event) -> Vec<WatchSignal> {
    event
        .paths
        .iter()
        .cloned()
        .map(WatchSignal::Arrived)
        .collect()
}

fn removals(event: &Event) -> Vec<WatchSignal> {
    event
        .paths
        .iter()
        .cloned()
        .map(WatchSignal::Removed)
        .collect()
}

fn by_existence(event: &Event) -> Vec<WatchSignal> {
    event
        .paths
        .iter()
        .cloned()
        .map(|path| {
            if path.exists() {
                WatchSignal::Arrived(path)
            } else {
                WatchSignal::Removed(path)
            }
        })
        .collect()
}

async fn handle_arrival(known: &mut HashSet<String>, path: PathBuf, events: &EventSender) {
    let Some(name) = file_name(&path) else {
        return;
    };
    if known.contains(&name) {
        return;
    }

    // Small delay to ensure the file write is complete
    tokio::time::sleep(SETTLE_DELAY).await;
    if !path.is_file() {
        return;
    }

    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                target: "vaultdrive::watch",
                "cannot read new file {}: {}", path.display(), err
            );
            return;
        }
    };

    known.insert(name.clone());
    debug!(target: "vaultdrive::watch", "new vault file {}", name);
    let _ = events
        .send(VaultEvent::Dropped {
            files: vec![IncomingFile {
                name,
                content,
                source_path: Some(path),
            }],
        })
        .await;
}

async fn handle_removal(known: &mut HashSet<String>, path: &Path, events: &EventSender) {
    let Some(name) = file_name(path) else {
        return;
    };
    if !known.remove(&name) {
        return;
    }

    debug!(target: "vaultdrive::watch", "vault file {} removed", name);
    let _ = events.send(VaultEvent::Deleted { name }).await;
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
