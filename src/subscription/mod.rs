// Live state fan-out and WebSocket subscription management

pub mod broadcaster;
pub mod manager;
pub mod protocol;

pub use broadcaster::StateBroadcaster;
pub use manager::ConnectionManager;
pub use protocol::{ClientMessage, ErrorMessage, StateMessage};
