//! tinylb: a small HTTP reverse-proxy load balancer.

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{ServerPool, Strategy};
