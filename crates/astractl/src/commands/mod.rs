//! Command implementations

pub mod bundle;
pub mod db;
pub mod login;
pub mod profile;
pub mod progress;
