//! AQI Monitor - Simulator, trend aggregator and sensor registry client
//! for the air-quality prediction backend.
//!
//! This library exposes the core modules for testing and reuse.

pub mod api;
pub mod common;
pub mod config;
pub mod error;
pub mod registry;
pub mod simulation;
pub mod trends;
