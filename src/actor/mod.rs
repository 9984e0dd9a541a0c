//! Actor System for Hot Updates
//!
//! Message-passing pipeline for `serve`:
//!
//! ```text
//! FsActor --TransformMsg--> TransformActor --Hmr--> Connection outboxes
//! (watch)                   (transform)                  |
//!                                                        v
//! acceptor --WsMsg::AddClient--> WsActor --pump--> browser sockets
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and change routing
//! - `transform` - Turns changes into coordinator calls
//! - `ws` - WebSocket transport (acceptor, handshake, outbox pump)
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod transform;
pub mod ws;

pub use coordinator::Coordinator;
