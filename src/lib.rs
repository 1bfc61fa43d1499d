//! relayprobe: run scripted network checks and hand the rest of the script
//! to the next probe over HTTP.

pub mod clients;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod script;
pub mod server;
