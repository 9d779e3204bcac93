//! HTTP echo server and pooled client
//!
//! The server echoes POST bodies back with status 200; the client posts
//! payloads either as a complete buffer or through a deferred writer and
//! reads the echoed body back.

pub mod body;
pub mod client;
pub mod config;
pub mod handler;
pub mod resolver;
pub mod server;


pub use body::{DeferredBody, DeferredWriter, deferred};
pub use client::{EchoResponse, HttpEchoClient, Submission};
pub use config::{ClientConfig, HttpConfig};
pub use handler::EchoHandler;
pub use resolver::TimedResolver;
pub use server::HttpEchoServer;
