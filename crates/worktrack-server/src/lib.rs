pub mod client;
pub mod errors;
pub mod event_bridge;
pub mod handlers;
pub mod health;
pub mod page;
pub mod rpc;
pub mod server;
pub mod shutdown;

pub use event_bridge::TrackerEvent;
pub use handlers::HandlerState;
pub use server::{start, start_with_state, ServerConfig, ServerHandle};
