//! Configuration and error vocabulary shared by both launchers

pub mod config;
pub mod error;
pub mod logging;
