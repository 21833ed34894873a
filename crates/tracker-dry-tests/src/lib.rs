// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for the tracker crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`events`] - Pan event builder
//! - [`pyramid`] - Synthetic pyramid source with call recording
//! - [`sink`] - Recording artifact sink with failure injection
#![forbid(unsafe_code)]

pub mod config;
pub mod events;
pub mod pyramid;
pub mod sink;

pub use config::InMemoryConfigStore;
pub use events::PanBuilder;
pub use pyramid::{RegionCall, SyntheticPyramid};
pub use sink::{RecordingSink, Recorded};
