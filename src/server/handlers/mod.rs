pub mod config;
pub mod drafts;
pub mod health;
pub mod sessions;
pub mod utils;
