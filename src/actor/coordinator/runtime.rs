use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::FsActor;
use crate::actor::messages::{TransformMsg, WsMsg};
use crate::actor::transform::TransformActor;
use crate::actor::ws::WsActor;

/// Run all actors until a shutdown signal (or until one of them exits).
pub(super) async fn run_actors(
    fs: FsActor,
    transform: TransformActor,
    ws: WsActor,
    transform_tx: mpsc::Sender<TransformMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let fs_handle = tokio::spawn(fs.run());
    let transform_handle = tokio::spawn(transform.run());
    let ws_handle = tokio::spawn(ws.run());

    loop {
        if let Some(rx) = &shutdown_rx
            && rx.try_recv().is_ok()
        {
            crate::debug!("serve"; "shutdown signal received");
            break;
        }
        if fs_handle.is_finished() || transform_handle.is_finished() || ws_handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let _ = transform_tx.send(TransformMsg::Shutdown).await;
    let _ = ws_tx.send(WsMsg::Shutdown).await;
    fs_handle.abort();

    let _ = tokio::time::timeout(Duration::from_millis(500), transform_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(500), ws_handle).await;
}
