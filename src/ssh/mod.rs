// ABOUTME: SSH client module for remote server connections.
// ABOUTME: Supports agent, key and password authentication, uploads and TCP tunnels.

mod client;
mod error;
mod forward;

pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use forward::Tunnel;
