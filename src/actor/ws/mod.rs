//! WebSocket Actor
//!
//! Transport for the Update Event Channel:
//! - completes handshakes for streams accepted by `server`, each on a
//!   blocking task so a stalled client never holds up the actor
//! - opens a `Connection` per client and announces it to the coordinator
//!   (the first one opens the connection gate)
//! - a pump thread writes each connection's queued events to its socket
//!
//! ```text
//! acceptor --AddClient--> WsActor --Hmr::connect--> UpdateChannel
//!                            |
//!                            +--> clients <--pump-- Connection outboxes
//! ```

mod pump;
mod server;

pub use server::start_ws_server;

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::hmr::{Connection, Hmr};
use pump::{Client, pump_loop};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    hmr: Arc<Hmr>,
    clients: Arc<Mutex<Vec<Client>>>,
    stop: Arc<AtomicBool>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>, hmr: Arc<Hmr>) -> Self {
        Self {
            rx,
            hmr,
            clients: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        let pump = {
            let clients = Arc::clone(&self.clients);
            let stop = Arc::clone(&self.stop);
            let hmr = Arc::clone(&self.hmr);
            std::thread::spawn(move || pump_loop(clients, hmr, stop))
        };

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::AddClient(stream) => self.add_client(stream),
                WsMsg::Shutdown => break,
            }
        }

        crate::debug!("ws"; "shutting down");
        self.stop.store(true, Ordering::Relaxed);
        let _ = pump.join();
        for mut client in self.clients.lock().drain(..) {
            let _ = client.ws.close(None);
            let _ = client.ws.flush();
        }
    }

    /// Handshake off the actor loop, then register the client.
    fn add_client(&self, stream: TcpStream) {
        let hmr = Arc::clone(&self.hmr);
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            let ws = match tokio::task::spawn_blocking(move || handshake(stream)).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    crate::log!("ws"; "handshake failed: {}", e);
                    return;
                }
                Err(e) => {
                    crate::log!("ws"; "handshake task failed: {}", e);
                    return;
                }
            };

            let (conn, outbox) = Connection::open();
            {
                let mut clients = clients.lock();
                clients.push(Client {
                    ws,
                    conn: Arc::clone(&conn),
                    outbox,
                });
                crate::log!("ws"; "browser connected (total: {})", clients.len());
            }
            hmr.connect(&conn).await;
        });
    }
}

/// Blocking server handshake, bounded by `HANDSHAKE_TIMEOUT`.
fn handshake(stream: TcpStream) -> Result<WebSocket<TcpStream>, String> {
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(|e| e.to_string())?;
    let ws = tungstenite::accept(stream).map_err(|e| e.to_string())?;

    // Polled by the pump from now on
    let stream = ws.get_ref();
    stream.set_read_timeout(None).map_err(|e| e.to_string())?;
    stream.set_nonblocking(true).map_err(|e| e.to_string())?;
    Ok(ws)
}
