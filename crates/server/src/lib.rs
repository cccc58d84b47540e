//! Slither+ game server library.

pub mod config;
pub mod error;
pub mod game;
pub mod gamecode;
pub mod leaderboard;
pub mod orb;
pub mod player;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::GameError;
pub use server::{run, SessionDirectory};
