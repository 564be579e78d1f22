//! HTTP/WS surface: router, authorization funnel, and startup config.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod middleware;
