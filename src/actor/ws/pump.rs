//! Outbox pump: moves coordinator events onto client sockets.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::hmr::{Connection, Hmr, Outbox};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A connected browser tab.
pub(super) struct Client {
    pub(super) ws: WebSocket<TcpStream>,
    /// Dropping this expires the connection's registry entry
    pub(super) conn: Arc<Connection>,
    pub(super) outbox: Outbox,
}

impl Client {
    /// Send queued events. `false` once the socket is unusable.
    fn drain(&mut self) -> bool {
        while let Ok(event) = self.outbox.try_recv() {
            crate::debug!("ws"; "#{} <- {}", self.conn.id(), event.label());
            if !self.write(Message::Text(event.to_json().into())) {
                return false;
            }
        }
        match self.ws.flush() {
            Ok(()) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(_) => false,
        }
    }

    fn write(&mut self, msg: Message) -> bool {
        match self.ws.write(msg) {
            Ok(()) => true,
            // Buffered; flushed on a later pass
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(e) => {
                crate::debug!("ws"; "#{} write failed: {}", self.conn.id(), e);
                false
            }
        }
    }

    /// Consume inbound frames. `false` once the client has gone away.
    fn poll_inbound(&mut self) -> bool {
        loop {
            match self.ws.read() {
                Ok(Message::Close(_)) => return false,
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return true;
                }
                Err(_) => return false,
            }
        }
    }
}

/// Drain every client's outbox and drop clients that disconnected.
pub(super) fn pump_loop(clients: Arc<Mutex<Vec<Client>>>, hmr: Arc<Hmr>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(POLL_INTERVAL);

        let mut clients = clients.lock();
        clients.retain_mut(|client| {
            let alive = client.poll_inbound() && client.drain();
            if !alive {
                crate::debug!("ws"; "client #{} disconnected", client.conn.id());
                hmr.disconnect(&client.conn);
            }
            alive
        });
    }
}
