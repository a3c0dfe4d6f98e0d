// Bounded-concurrency polling of the state source

mod config;
mod scheduler;

pub use config::PollerConfig;
pub use scheduler::PollScheduler;
