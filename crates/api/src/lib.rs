//! HTTP API: routing, request/response mapping and server bootstrap helpers.

pub mod app;
pub mod server;
