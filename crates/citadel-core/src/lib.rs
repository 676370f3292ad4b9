//! Core types and definitions for the CITADEL tower-defense simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! components, commands, state snapshots, events, configuration, constants
//! and the pure path/grid geometry. It has no dependency on any runtime.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod geometry;
pub mod state;
pub mod types;
