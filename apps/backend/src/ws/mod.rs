//! Realtime layer: wire protocol, presence hub, and the per-connection
//! session actor.

pub mod hub;
pub mod protocol;
pub mod session;
