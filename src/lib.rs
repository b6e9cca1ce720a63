//! Library exports for the dynamic QR service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod config;
pub mod error;
pub mod handler;
pub mod ids;
pub mod middleware;
pub mod model;
pub mod resolver;
pub mod route;
pub mod session;
pub mod state;
pub mod store;
