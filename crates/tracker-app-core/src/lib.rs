// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for the tracker (config port, reconstruction
//! preferences). Keeps binaries and adapters thin.

pub mod config;
pub mod prefs;
