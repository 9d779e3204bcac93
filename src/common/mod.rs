//! Common traits and helpers used across the echoprobe library
//!
//! This module contains the traits that separate the harness from the
//! HTTP server and client it drives.

pub mod test_utils;
pub mod traits;

pub use test_utils::{TestServer, spawn_test_server, spawn_test_server_with_config};
pub use traits::{EchoClient, EchoServerTrait};
