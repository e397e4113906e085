//! # Resumable Release
//!
//! Release management for version-controlled source projects.
//!
//! A release is a sequence of phases (release commit, archive export,
//! development commit, candidate tests, operator gate, tag and publish), each
//! recorded in a checkpoint file so an interrupted run picks up where it
//! stopped and never repeats a completed step.
//!
//! ## Features
//!
//! - **Resumable**: `release-status.json` records every completed phase
//! - **Safe**: consistency checks refuse to continue when `HEAD` moved
//! - **Tested candidates**: tests run against the exported, read-only archive
//! - **Verified uploads**: every uploaded file is checked by remote size
//! - **Rollback**: failed candidates leave the working copy as it was
//!
//! ## Usage
//!
//! ```bash
//! resumable_release --public-url https://example.com/releases/ --master-feed feed.json
//! resumable_release status     # show the release in progress
//! resumable_release rollback   # abandon an unfinished release
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod manifest;
pub mod operator;
pub mod process;
pub mod publish;
pub mod scm;
pub mod state;
pub mod upload;
pub mod version;

pub use cli::Args;
pub use config::ReleaseConfig;
pub use controller::{ReleaseController, ReleaseOutcome, ReleaseStage};
pub use error::{CliError, ReleaseError, Result};
pub use operator::{GateChoice, Operator};
pub use scm::{ScmAdapter, SystemGit};
pub use state::{ReleaseCheckpoint, StateManager};
