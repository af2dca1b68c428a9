pub mod aggregate;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod error;
pub mod fares;
pub mod format;
pub mod models;
pub mod storage;
pub mod sync;
