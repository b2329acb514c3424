pub mod config;
pub mod engine;

pub use config::WakeConfig;
pub use engine::{WakeEngine, WakeHit};
