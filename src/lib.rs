// HTTP, WebSocket and SSE endpoints
pub mod api;

// Configuration loading
pub mod config;

// Bounded-concurrency entity polling
pub mod poller;

// State records and store decorators
pub mod state;

// Live state fan-out
pub mod subscription;

// Home Assistant REST client
pub mod upstream;
