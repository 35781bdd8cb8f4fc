pub mod config;
pub mod db;
pub mod error;
pub mod nhl;
pub mod notifier;
pub mod scoreboard;
