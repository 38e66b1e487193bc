//! Transport: websocket endpoint and wire protocol

pub mod protocol;
pub mod server;

pub use protocol::{ClientMsg, MatchView, ServerMsg};
pub use server::serve;
