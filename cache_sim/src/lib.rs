pub mod bulk;
pub mod cache;
pub mod config;
pub mod location;
pub mod memory;
pub mod sim;
pub mod stat;
pub mod trace;
pub mod traffic;
