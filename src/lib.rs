//! Hoard - workspace build-artifact cache
//!
//! Computes dependency-aware cache keys for JavaScript monorepo workspaces,
//! detects changed workspaces from a git diff, and saves, restores and evicts
//! their build artifacts under per-key locks.

pub mod cache;
pub mod changes;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod install;
pub mod manager;
pub mod workspace;

pub use error::{HoardError, HoardResult};
pub use manager::CacheManager;
