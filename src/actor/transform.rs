//! Transform Actor
//!
//! Receives routed changes from the FsActor and drives the coordinator.
//!
//! Style imports go through a dedicated delivery task: `Hmr::import`
//! suspends until the first browser connects, and that wait must not hold up
//! reloads or later transforms. The task awaits imports one at a time, so
//! they reach the gate in the order the changes arrived.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::TransformMsg;
use crate::config::cfg;
use crate::hmr::{Artifact, ArtifactKind, Hmr, SourcePatchInjector};
use crate::logger::{status_error, status_success};
use crate::transform::Transformer;

pub struct TransformActor {
    rx: mpsc::Receiver<TransformMsg>,
    hmr: Arc<Hmr>,
    transformer: Arc<Transformer>,
}

impl TransformActor {
    pub fn new(rx: mpsc::Receiver<TransformMsg>, hmr: Arc<Hmr>, transformer: Arc<Transformer>) -> Self {
        Self {
            rx,
            hmr,
            transformer,
        }
    }

    pub async fn run(mut self) {
        let (import_tx, import_rx) = mpsc::unbounded_channel();
        let delivery = tokio::spawn(deliver_imports(Arc::clone(&self.hmr), import_rx));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                TransformMsg::Import { path, kind } => {
                    if self.import(&path, kind, &import_tx).is_err() {
                        break;
                    }
                }

                TransformMsg::HotImport(path) => {
                    let url = self.transformer.identity(&path);
                    self.hmr.hot_import(url.clone());
                    status_success(&format!("hot-import {url}"));
                }

                TransformMsg::RscReload { reason } => {
                    // Clients drop every injected style on this event; rebuild
                    // and replay them after it
                    let voided = self.hmr.rsc_reload();
                    status_success(&format!("refetch fragments: {reason}"));
                    for artifact in voided {
                        let Some(path) = artifact.source().filter(|p| p.exists()) else {
                            continue;
                        };
                        if self.import(path, artifact.kind(), &import_tx).is_err() {
                            break;
                        }
                    }
                }

                TransformMsg::FullReload { reason, invalidate } => {
                    for path in &invalidate {
                        self.transformer.invalidate(path);
                    }
                    self.hmr.full_reload();
                    status_success(&format!("reload: {reason}"));
                }

                TransformMsg::ConfigChanged => {
                    // The FsActor has already swapped in the new config
                    match SourcePatchInjector::from_config(&cfg().patch) {
                        Ok(patcher) => self.transformer.set_patcher(patcher),
                        Err(e) => status_error("invalid [patch] marker", &e.to_string()),
                    }
                    self.hmr.full_reload();
                    status_success("reload: config changed");
                }

                TransformMsg::Shutdown => {
                    crate::debug!("hmr"; "shutting down");
                    break;
                }
            }
        }

        delivery.abort();
    }

    /// Transform `path` and queue it for delivery. `Err` once the delivery
    /// task is gone.
    fn import(
        &self,
        path: &Path,
        kind: ArtifactKind,
        import_tx: &mpsc::UnboundedSender<Arc<Artifact>>,
    ) -> Result<(), ()> {
        match self.transformer.transform(path, kind) {
            Ok(artifact) => {
                if !self.hmr.gate().is_open() {
                    crate::debug!("hmr"; "{} queued until a browser connects", artifact.id());
                }
                import_tx.send(artifact).map_err(|_| ())
            }
            Err(e) => {
                status_error(&format!("transform failed: {}", path.display()), &e.to_string());
                Ok(())
            }
        }
    }
}

async fn deliver_imports(hmr: Arc<Hmr>, mut rx: mpsc::UnboundedReceiver<Arc<Artifact>>) {
    while let Some(artifact) = rx.recv().await {
        let id = artifact.id().to_string();
        hmr.import(artifact).await;
        status_success(&format!("update {id}"));
    }
}
