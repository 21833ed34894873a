// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted service preferences and shared handler state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use pan_history::PyramidSource;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracker_activity::ActivityLog;
use tracker_app_core::prefs::ReconstructionPrefs;

/// Config key the preferences are stored under.
pub const PREFS_KEY: &str = "tracker_service";

/// Service settings, loaded from the config store and overridden by flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServicePrefs {
    /// HTTP listen address.
    pub listen: SocketAddr,
    /// Directory of source images.
    pub image_dir: PathBuf,
    /// Directory composites are written under.
    pub artifact_dir: PathBuf,
    /// JSON-lines activity journal.
    pub journal_path: PathBuf,
    /// Magnification the source images were scanned at.
    pub magnification: f64,
    /// Reconstruction defaults; requests may override some fields.
    pub reconstruction: ReconstructionPrefs,
}

impl Default for ServicePrefs {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8787)),
            image_dir: PathBuf::from("data/images"),
            artifact_dir: PathBuf::from("data/artifacts"),
            journal_path: PathBuf::from("data/activity.jsonl"),
            magnification: ReconstructionPrefs::MAGNIFICATION,
            reconstruction: ReconstructionPrefs::default(),
        }
    }
}

/// Activity log shared by all handlers.
pub type SharedLog = Box<dyn ActivityLog + Send + Sync>;

/// Pyramid source shared by all handlers.
pub type SharedSource = Arc<dyn PyramidSource + Send + Sync>;

/// State behind every route.
pub struct AppState {
    /// Read for reconstruction, write for appends.
    pub log: RwLock<SharedLog>,
    /// Pixel source.
    pub images: SharedSource,
    /// Root for composite artifacts.
    pub artifact_dir: PathBuf,
    /// Defaults for reconstruction requests.
    pub prefs: ReconstructionPrefs,
}

impl AppState {
    /// Bundle the collaborators.
    pub fn new(log: SharedLog, images: SharedSource, artifact_dir: PathBuf, prefs: ReconstructionPrefs) -> Self {
        Self {
            log: RwLock::new(log),
            images,
            artifact_dir,
            prefs,
        }
    }
}
