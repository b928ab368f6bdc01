//! pr-screenshots: upload images to a hosting backend and publish their URLs
//! into the `## Screenshots` section of a GitHub pull request description.
//!
//! The crate is built around three seams so every external effect can be
//! substituted in tests:
//! - [`exec::CommandRunner`] for process invocation (`sips`, `curl`, `gh`),
//! - [`config::CredentialSource`] for API credentials,
//! - [`ids::IdSource`] for collision-avoidance filename suffixes.

pub mod backend;
pub mod cli;
pub mod compress;
pub mod config;
pub mod exec;
pub mod ids;
pub mod pr;
pub mod section;
