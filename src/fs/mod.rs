//! Filesystem utilities for benchlock.
//!
//! Owner records must never be observed half-written, so every write to one
//! goes through [`atomic_write`].

pub mod atomic;

pub use atomic::{atomic_write, remove_if_exists};
