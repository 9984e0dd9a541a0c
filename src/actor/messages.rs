//! Actor Message Definitions
//!
//! ```text
//! FsActor --TransformMsg--> TransformActor
//! acceptor --WsMsg--> WsActor
//! ```

use std::net::TcpStream;
use std::path::PathBuf;

use crate::hmr::ArtifactKind;

/// Messages to the Transform Actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformMsg {
    /// A style changed: transform it and deliver a `module-import`
    Import { path: PathBuf, kind: ArtifactKind },
    /// A client script changed: let the browser re-import it
    HotImport(PathBuf),
    /// Server components changed: refetch fragments
    RscReload { reason: String },
    /// Reload every page, dropping cached transforms for `invalidate`
    FullReload {
        reason: String,
        invalidate: Vec<PathBuf>,
    },
    /// `hmr.toml` changed
    ConfigChanged,
    /// Shutdown
    Shutdown,
}

/// Messages to the WebSocket Actor
pub enum WsMsg {
    /// Raw accepted stream, handshake pending
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
