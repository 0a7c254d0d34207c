//! Listener lifecycle, dispatch table, and connection worker for an
//! embeddable, thread-per-connection RPC/static-file HTTP server.
//!
//! Built on top of `rws-http`'s protocol/transport plumbing: this crate owns
//! the accept loop, the per-connection worker that decides between redirect,
//! RPC dispatch, and static-file serving, and the companion blocking client
//! used by this workspace's own integration tests.

pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod handle;
pub mod listener;
mod worker;

pub use config::{ListenerConfig, ListenerConfigBuilder, TransportMode};
pub use context::ConnectionContext;
pub use dispatch::{DispatchTable, Namespace, RpcFunction};
pub use handle::ListenerHandle;
pub use listener::Listener;
