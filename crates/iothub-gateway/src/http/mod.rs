pub mod auth;
pub mod device;
pub mod error;
pub mod health;
pub mod schedule;
pub mod user;
