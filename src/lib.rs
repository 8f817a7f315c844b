//! funny-voice-rs library crate
//!
//! This module exposes internal types for integration testing.
//! The main binary is in main.rs.

#[macro_use]
extern crate log;

pub mod analyser;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod net;
pub mod rewrite;
pub mod session;
pub mod sfx;
pub mod stdin;
pub mod synth;
pub mod transport;
pub mod ui_state;
pub mod visualizer;
pub mod voice;
pub mod wav;

// Test modules
#[cfg(test)]
mod analyser_tests;
