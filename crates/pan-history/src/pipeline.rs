// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end reconstruction: select, order, deduplicate, lay out, then
//! report, assemble or flatten.

use image::RgbaImage;
use tracing::{debug, info};
use tracker_activity::{ActivityLog, Sort};
use tracker_app_core::prefs::ReconstructionPrefs;
use tracker_cas::ArtifactSink;

use crate::assemble::{assemble, flatten, Composite};
use crate::dedup::{downsample, order_for_dedup, AcceptedRegions};
use crate::error::PanHistoryError;
use crate::extract::{extract_patches, layout, ExtractedArea};
use crate::report::{report, PanHistoryReport};
use crate::select::{select_pan_events, PanEvent, PanQuery};
use crate::source::{ImageMeta, PyramidSource};

/// Everything needed to reconstruct one image's pan history.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionRequest {
    /// Image to reconstruct.
    pub image_id: String,
    /// Earliest `epochms`, inclusive.
    pub start_time: f64,
    /// Latest `epochms`, inclusive.
    pub end_time: f64,
    /// Tuning.
    pub prefs: ReconstructionPrefs,
    /// Query ordering, used for paging.
    pub sort: Sort,
    /// Maximum number of pan events fetched.
    pub limit: Option<usize>,
    /// Number of leading pan events skipped.
    pub offset: usize,
}

impl ReconstructionRequest {
    /// Whole history of `image_id` with default preferences.
    pub fn new(image_id: impl Into<String>) -> Self {
        let query = PanQuery::new(image_id);
        Self {
            image_id: query.image_id,
            start_time: query.start_time,
            end_time: query.end_time,
            prefs: ReconstructionPrefs::default(),
            sort: query.sort,
            limit: query.limit,
            offset: query.offset,
        }
    }

    /// Restrict to `[start, end]`.
    pub fn between(mut self, start: f64, end: f64) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Replace the preferences.
    pub fn with_prefs(mut self, prefs: ReconstructionPrefs) -> Self {
        self.prefs = prefs;
        self
    }

    /// Set query ordering and paging.
    pub fn paged(mut self, sort: Sort, limit: Option<usize>, offset: usize) -> Self {
        self.sort = sort;
        self.limit = limit;
        self.offset = offset;
        self
    }

    fn pan_query(&self) -> PanQuery {
        PanQuery {
            image_id: self.image_id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            zoom_precision: self.prefs.zoom_precision,
            sort: self.sort,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Pan events picked for one request.
///
/// Selection is the only stage that reads the log; the remaining stages work
/// from this snapshot, so callers can release the log before any pixels are
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    request: ReconstructionRequest,
    events: Vec<PanEvent>,
}

impl Selection {
    /// Select, order and keep the events `request` reconstructs from.
    pub fn new<L>(log: &L, request: &ReconstructionRequest) -> Result<Self, PanHistoryError>
    where
        L: ActivityLog + ?Sized,
    {
        request.prefs.validate()?;
        let mut events = select_pan_events(log, &request.pan_query())?;
        order_for_dedup(&mut events, request.prefs.dedup_order);
        Ok(Self {
            request: request.clone(),
            events,
        })
    }

    /// Selected events in dedup order.
    pub fn events(&self) -> &[PanEvent] {
        &self.events
    }

    /// Geometry-only reconstruction. No pixels are fetched and nothing is
    /// written.
    pub fn report<S>(&self, source: &S) -> Result<Option<PanHistoryReport>, PanHistoryError>
    where
        S: PyramidSource + ?Sized,
    {
        let Some((accepted, meta)) = self.accept(source)? else {
            return Ok(None);
        };
        let area = layout(&accepted, &meta);
        match &area {
            Some(area) => debug!(
                image_id = %self.request.image_id,
                levels = area.levels.len(),
                width = area.bounds.width(),
                height = area.bounds.height(),
                "laid out panned area"
            ),
            None => info!(image_id = %self.request.image_id, levels = meta.levels, "no level inside the pyramid"),
        }
        Ok(area.map(|area| report(&area)))
    }

    /// Fetch pixels, write one mosaic per level plus the descriptor into
    /// `destination`.
    pub fn composite<S, K>(
        &self,
        source: &S,
        sink: &mut K,
        destination: &str,
    ) -> Result<Option<Composite>, PanHistoryError>
    where
        S: PyramidSource + ?Sized,
        K: ArtifactSink + ?Sized,
    {
        let Some(extracted) = self.extract(source)? else {
            return Ok(None);
        };
        Ok(Some(assemble(&extracted, sink, destination)?))
    }

    /// Fetch pixels and flatten them into one raster at `scale` native
    /// pixels per output pixel (default: the coarsest level's factor).
    pub fn raster<S>(&self, source: &S, scale: Option<u32>) -> Result<Option<RgbaImage>, PanHistoryError>
    where
        S: PyramidSource + ?Sized,
    {
        let Some(extracted) = self.extract(source)? else {
            return Ok(None);
        };
        Ok(Some(flatten(&extracted, scale)?))
    }

    /// Deduplicate and resolve image metadata. `Ok(None)` means nothing to
    /// reconstruct.
    fn accept<S>(&self, source: &S) -> Result<Option<(AcceptedRegions, ImageMeta)>, PanHistoryError>
    where
        S: PyramidSource + ?Sized,
    {
        let image_id = self.request.image_id.as_str();
        if self.events.is_empty() {
            info!(image_id, "no pan activity in window");
            return Ok(None);
        }
        let accepted = downsample(&self.events, self.request.prefs.area_threshold);
        let Some(mut meta) = source.metadata(image_id)? else {
            info!(image_id, "no image metadata");
            return Ok(None);
        };
        meta.magnification = Some(meta.magnification.unwrap_or(self.request.prefs.default_magnification));
        Ok(Some((accepted, meta)))
    }

    fn extract<S>(&self, source: &S) -> Result<Option<ExtractedArea>, PanHistoryError>
    where
        S: PyramidSource + ?Sized,
    {
        let Some((accepted, meta)) = self.accept(source)? else {
            return Ok(None);
        };
        Ok(extract_patches(&accepted, &meta, source, &self.request.image_id)?)
    }
}

/// Geometry-only reconstruction straight from the log.
pub fn reconstruct_report<L, S>(
    log: &L,
    source: &S,
    request: &ReconstructionRequest,
) -> Result<Option<PanHistoryReport>, PanHistoryError>
where
    L: ActivityLog + ?Sized,
    S: PyramidSource + ?Sized,
{
    Selection::new(log, request)?.report(source)
}

/// [`Selection::composite`] straight from the log.
pub fn reconstruct_composite<L, S, K>(
    log: &L,
    source: &S,
    sink: &mut K,
    request: &ReconstructionRequest,
    destination: &str,
) -> Result<Option<Composite>, PanHistoryError>
where
    L: ActivityLog + ?Sized,
    S: PyramidSource + ?Sized,
    K: ArtifactSink + ?Sized,
{
    Selection::new(log, request)?.composite(source, sink, destination)
}

/// [`Selection::raster`] straight from the log.
pub fn reconstruct_raster<L, S>(
    log: &L,
    source: &S,
    request: &ReconstructionRequest,
    scale: Option<u32>,
) -> Result<Option<RgbaImage>, PanHistoryError>
where
    L: ActivityLog + ?Sized,
    S: PyramidSource + ?Sized,
{
    Selection::new(log, request)?.raster(source, scale)
}
