//! Handlers behind the `login`, `sync`, `status` and `watch` commands.

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::config::SettingsStore;
use crate::error::{errors, VaultResult};
use crate::events::{EventBus, EventKind, VaultEvent};
use crate::notices::{Notifier, TermNotifier};
use crate::remote::drive::DriveClient;
use crate::remote::CloudStore;
use crate::sync::{DeletionPropagator, IncomingProcessor, PassProgressEvent, PassReport, SyncEngine};
use crate::vault::{FsVault, Vault};
use crate::watch::start_vault_watcher;

pub struct BridgeCommand {
    settings_store: SettingsStore,
}

/// Everything a command needs to talk to both sides of the bridge.
struct Bridge {
    session: AuthSession,
    store: Arc<dyn CloudStore>,
    vault: Arc<dyn Vault>,
    folder_id: String,
    sync_dir: PathBuf,
}

impl BridgeCommand {
    pub fn new() -> VaultResult<Self> {
        Ok(Self {
            settings_store: SettingsStore::new()?,
        })
    }

    pub fn with_settings_store(settings_store: SettingsStore) -> Self {
        Self { settings_store }
    }

    fn connect(&self) -> VaultResult<Bridge> {
        let settings = self.settings_store.load()?;
        let folder_id = settings.folder_id.clone();
        let sync_dir = PathBuf::from(settings.resolved_file_directory()?);
        let session = AuthSession::new(settings, self.settings_store.clone());
        let store: Arc<dyn CloudStore> = Arc::new(DriveClient::new(session.clone()));

        Ok(Bridge {
            session,
            store,
            vault: Arc::new(FsVault::new()),
            folder_id,
            sync_dir,
        })
    }

    /// Run the authorization code flow end to end.
    pub async fn execute_login(&self) -> VaultResult<i32> {
        let term = Term::stdout();

        let settings = self.settings_store.load()?;
        let session = AuthSession::new(settings, self.settings_store.clone());

        term.write_line("🔐 Starting Google Drive authorization...")?;
        term.write_line("")?;

        let url = session.begin_authorization().await?;
        term.write_line("Open this URL in your browser and approve access:")?;
        term.write_line(&format!("  {}", url))?;
        term.write_line("")?;

        if webbrowser::open(&url).is_ok() {
            term.write_line("🌐 Opened the authorization page in your browser.")?;
            term.write_line("")?;
        }

        term.write_str("Paste the authorization code here: ")?;
        io::stdout().flush()?;
        let mut code = String::new();
        io::stdin().read_line(&mut code)?;
        let code = code.trim();

        if code.is_empty() {
            term.write_line("🚫 No code entered. Authorization cancelled.")?;
            return Ok(1);
        }

        term.write_line("")?;
        term.write_line("🔄 Exchanging the code for tokens...")?;
        if let Err(e) = session.complete_authorization(code).await {
            term.write_line("🚫 Authorization failed:")?;
            term.write_line(&format!("   {}", e.user_message()))?;
            return Ok(1);
        }

        term.write_line("✅ Authorization complete. Tokens saved.")?;

        let settings = session.settings().await;
        if settings.folder_id.is_empty() {
            term.write_line("")?;
            term.write_line("ℹ️  No Drive folder configured yet.")?;
            term.write_line(&format!(
                "   Set folder_id in {} before running sync.",
                self.settings_store.path().display()
            ))?;
        }

        Ok(0)
    }

    /// Run one reconciliation pass.
    pub async fn execute_sync(&self) -> VaultResult<i32> {
        let term = Term::stdout();
        let bridge = self.connect()?;

        if !bridge.session.state().await.is_authenticated() {
            term.write_line("🚫 Not authenticated. Run `vaultdrive login` first.")?;
            return Ok(1);
        }

        term.write_line("🚀 Starting sync pass...")?;
        term.write_line(&format!("📁 Local directory: {}", bridge.sync_dir.display()))?;
        term.write_line("")?;

        let engine = SyncEngine::new(
            bridge.store.clone(),
            bridge.vault.clone(),
            bridge.folder_id.clone(),
            bridge.sync_dir.clone(),
        );

        let report = run_pass_with_progress(&engine).await?;
        term.write_line("")?;
        print_pass_summary(&term, &report)?;

        Ok(if report.failed_uploads == 0 { 0 } else { 1 })
    }

    /// Show authorization state, configuration and pending uploads.
    pub async fn execute_status(&self) -> VaultResult<i32> {
        let term = Term::stdout();
        let bridge = self.connect()?;

        term.write_line("📊 Bridge Status:")?;
        term.write_line("")?;

        let state = bridge.session.state().await;
        term.write_line(&format!("  Google Drive: {}", state.describe()))?;
        term.write_line("")?;

        term.write_line("Configuration:")?;
        term.write_line(&format!(
            "  Settings file: {}",
            self.settings_store.path().display()
        ))?;
        let folder = if bridge.folder_id.is_empty() {
            "(not set)".to_string()
        } else {
            bridge.folder_id.clone()
        };
        term.write_line(&format!("  Drive folder: {}", folder))?;
        term.write_line(&format!("  Sync directory: {}", bridge.sync_dir.display()))?;
        term.write_line("")?;

        if state.is_authenticated() && !bridge.folder_id.is_empty() {
            let engine = SyncEngine::new(
                bridge.store.clone(),
                bridge.vault.clone(),
                bridge.folder_id.clone(),
                bridge.sync_dir.clone(),
            );
            match engine.plan().await {
                Ok(plan) if plan.is_empty() => {
                    term.write_line("  Pending uploads: none")?;
                }
                Ok(plan) => {
                    term.write_line(&format!("  Pending uploads: {}", plan.len()))?;
                    for file in &plan {
                        term.write_line(&format!("    - {}", file.name))?;
                    }
                }
                Err(_) => {
                    term.write_line("  Pending uploads: ❌ Unknown (check failed)")?;
                }
            }
            term.write_line("")?;
        }

        Ok(0)
    }

    /// Run a startup pass, then mirror vault changes until interrupted.
    pub async fn execute_watch(&self) -> VaultResult<i32> {
        let term = Term::stdout();
        let bridge = self.connect()?;

        if !bridge.session.state().await.is_authenticated() {
            term.write_line("🚫 Not authenticated. Run `vaultdrive login` first.")?;
            return Ok(1);
        }

        term.write_line("🚀 Running a startup sync pass...")?;
        let engine = SyncEngine::new(
            bridge.store.clone(),
            bridge.vault.clone(),
            bridge.folder_id.clone(),
            bridge.sync_dir.clone(),
        );
        let report = run_pass_with_progress(&engine).await?;
        term.write_line("")?;
        print_pass_summary(&term, &report)?;

        let notifier: Arc<dyn Notifier> = Arc::new(TermNotifier::default());
        let incoming = Arc::new(IncomingProcessor::new(
            bridge.store.clone(),
            bridge.vault.clone(),
            notifier.clone(),
            bridge.folder_id.clone(),
            bridge.sync_dir.clone(),
        ));
        let deletions = Arc::new(DeletionPropagator::new(
            bridge.store.clone(),
            notifier,
            bridge.folder_id.clone(),
        ));

        let (sender, mut bus) = EventBus::new();

        let drop_handler = incoming.clone();
        bus.on(EventKind::Dropped, move |event| {
            let incoming = drop_handler.clone();
            Box::pin(async move {
                if let VaultEvent::Dropped { files } = event {
                    incoming.process_batch(files).await;
                }
            })
        });

        let paste_handler = incoming;
        bus.on(EventKind::Pasted, move |event| {
            let incoming = paste_handler.clone();
            Box::pin(async move {
                if let VaultEvent::Pasted { files } = event {
                    incoming.process_batch(files).await;
                }
            })
        });

        bus.on(EventKind::Deleted, move |event| {
            let deletions = deletions.clone();
            Box::pin(async move {
                if let VaultEvent::Deleted { name } = event {
                    let _ = deletions.propagate(&name).await;
                }
            })
        });

        let known: HashSet<String> = match bridge.vault.list_children(&bridge.sync_dir) {
            Ok(files) => files.into_iter().map(|f| f.name).collect(),
            Err(_) => HashSet::new(),
        };

        start_vault_watcher(bridge.sync_dir.clone(), known, sender)
            .await
            .map_err(|e| {
                errors::local_io_error(
                    format!("cannot watch directory: {}", e),
                    bridge.sync_dir.display().to_string(),
                )
            })?;

        term.write_line("")?;
        term.write_line(&format!(
            "👀 Watching {} for changes. Press Ctrl-C to stop.",
            bridge.sync_dir.display()
        ))?;

        tokio::select! {
            _ = bus.run() => {}
            _ = tokio::signal::ctrl_c() => {
                term.write_line("")?;
                term.write_line("👋 Stopping watch mode.")?;
            }
        }

        Ok(0)
    }
}

async fn run_pass_with_progress(engine: &SyncEngine) -> VaultResult<PassReport> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let report = engine
        .run_pass_with_observer(|event| match event {
            PassProgressEvent::Planned { total } => {
                progress.set_length(total as u64);
                progress.set_message("Uploading");
            }
            PassProgressEvent::Uploaded { name } => {
                progress.inc(1);
                progress.set_message(name);
            }
            PassProgressEvent::Failed { name, .. } => {
                progress.inc(1);
                progress.set_message(format!("{} failed", name));
            }
        })
        .await;

    match &report {
        Ok(_) => progress.finish_with_message("Sync complete"),
        Err(_) => progress.finish_with_message("Sync failed"),
    }
    report
}

fn print_pass_summary(term: &Term, report: &PassReport) -> VaultResult<()> {
    term.write_line("📊 Sync Summary:")?;
    term.write_line(&format!("   Local files: {}", report.local_files))?;
    term.write_line(&format!("   Remote files: {}", report.remote_files))?;
    term.write_line(&format!("   Uploaded: {}", report.uploaded_files))?;
    term.write_line(&format!("   Failed: {}", report.failed_uploads))?;
    term.write_line(&format!(
        "   Bytes uploaded: {}",
        report.total_bytes_uploaded
    ))?;

    for result in report.results.iter().filter(|r| !r.uploaded) {
        term.write_line(&format!("   ⚠️  {}: {}", result.name, result.message))?;
    }
    term.write_line("")?;

    if report.planned_uploads == 0 {
        term.write_line("✅ Nothing to upload. Drive is up to date.")?;
    } else if report.failed_uploads == 0 {
        term.write_line("🎉 All files synced to Google Drive!")?;
    } else {
        term.write_line("⚠️  Sync completed with warnings.")?;
    }

    Ok(())
}
