//! Actor Coordinator - wires up the hot-update actor system
//!
//! - Binds the WebSocket transport and records the port on `Hmr`
//! - Creates channels and actors
//! - Runs them until shutdown

mod runtime;

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::{TransformMsg, WsMsg};
use super::transform::TransformActor;
use super::ws::{WsActor, start_ws_server};
use crate::config::HmrConfig;
use crate::hmr::Hmr;
use crate::transform::Transformer;

const CHANNEL_BUFFER: usize = 32;

pub struct Coordinator {
    config: Arc<HmrConfig>,
    hmr: Arc<Hmr>,
    transformer: Arc<Transformer>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<HmrConfig>, hmr: Arc<Hmr>, transformer: Arc<Transformer>) -> Self {
        Self {
            config,
            hmr,
            transformer,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    pub async fn run(mut self) -> Result<()> {
        let (transform_tx, transform_rx) = mpsc::channel::<TransformMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        let serve = &self.config.serve;
        let port = start_ws_server(serve.interface, serve.ws_port, ws_tx.clone())?;
        self.hmr.set_ws_port(port);
        crate::log!("serve"; "websocket listening on ws://{}:{}", serve.interface, port);

        let fs = FsActor::new(&self.config, transform_tx.clone()).context("failed to start watcher")?;
        let transform = TransformActor::new(transform_rx, Arc::clone(&self.hmr), Arc::clone(&self.transformer));
        let ws = WsActor::new(ws_rx, Arc::clone(&self.hmr));

        crate::debug!("serve"; "actors starting");
        runtime::run_actors(fs, transform, ws, transform_tx, ws_tx, self.shutdown_rx.take()).await;
        crate::debug!("serve"; "actors stopped");
        Ok(())
    }
}
