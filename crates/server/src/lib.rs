//! Shipping quote HTTP service
//!
//! Wires the inference pipeline from `shipping-lib` to an axum router.

pub mod api;
pub mod config;
