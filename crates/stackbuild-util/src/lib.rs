#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for stackbuild.
//!
//! This crate provides pure helper functions with no logging/tracing dependencies.
//! Logging is handled by the crates that own a subscriber or a diagnostics channel.

pub mod fs;
pub mod hash;
pub mod vpath;
