// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pan tracker service.
//!
//! Logs viewer activity to a JSON-lines journal and reconstructs the regions
//! of an image that were looked at, as a report, a written composite or a
//! flattened PNG.

mod images;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracker_activity::JournalActivityLog;
use tracker_app_core::config::ConfigService;
use tracker_config_fs::FsConfigStore;

use crate::images::DirImageSource;
use crate::state::{AppState, ServicePrefs, PREFS_KEY};

#[derive(Parser, Debug)]
#[command(author, version, about = "Viewer activity tracker and pan-history service")]
struct Args {
    /// HTTP listener (overrides the stored preference)
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Directory holding `<image_id>.png|jpg` source images
    #[arg(long)]
    image_dir: Option<PathBuf>,
    /// Directory composites are written under
    #[arg(long)]
    artifact_dir: Option<PathBuf>,
    /// Activity journal (JSON lines)
    #[arg(long)]
    journal: Option<PathBuf>,
    /// Magnification the source images were scanned at
    #[arg(long)]
    magnification: Option<f64>,
}

impl Args {
    fn apply(self, mut prefs: ServicePrefs) -> ServicePrefs {
        if let Some(listen) = self.listen {
            prefs.listen = listen;
        }
        if let Some(dir) = self.image_dir {
            prefs.image_dir = dir;
        }
        if let Some(dir) = self.artifact_dir {
            prefs.artifact_dir = dir;
        }
        if let Some(path) = self.journal {
            prefs.journal_path = path;
        }
        if let Some(magnification) = self.magnification {
            prefs.magnification = magnification;
        }
        prefs
    }
}

fn load_prefs() -> ServicePrefs {
    match FsConfigStore::new() {
        Ok(store) => ConfigService::new(store).load_or_init(PREFS_KEY),
        Err(err) => {
            warn!(?err, "config store unavailable, using defaults");
            ServicePrefs::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let prefs = args.apply(load_prefs());
    prefs
        .reconstruction
        .validate()
        .context("invalid reconstruction preferences")?;
    if !(prefs.magnification.is_finite() && prefs.magnification > 0.0) {
        anyhow::bail!("invalid image magnification {}", prefs.magnification);
    }

    let log = JournalActivityLog::open(&prefs.journal_path)
        .with_context(|| format!("open activity journal {}", prefs.journal_path.display()))?;
    let images = DirImageSource::new(&prefs.image_dir, prefs.magnification);
    info!(
        images = %images.root().display(),
        artifacts = %prefs.artifact_dir.display(),
        "serving images"
    );
    let state = Arc::new(AppState::new(
        Box::new(log),
        Arc::new(images),
        prefs.artifact_dir.clone(),
        prefs.reconstruction,
    ));

    let listener = TcpListener::bind(prefs.listen)
        .await
        .with_context(|| format!("bind {}", prefs.listen))?;
    info!("tracker service listening on {}", listener.local_addr()?);
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("tracker service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
