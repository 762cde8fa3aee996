use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lastile_codec::{BlockReader, PointWriter};
use lastile_core::error::{Result, TilingError};
use lastile_core::geom::{AreaShape, Polygon, Rect};
use lastile_core::grid::TileGrid;
use lastile_core::index::Block;
use lastile_core::progress::{LogNotifier, Notifier, Progress};

use crate::areas::{self, AreaRequest, BatchMode};
use crate::frame::CommonFrame;
use crate::source::Source;

/// Outcome of one extraction area.
#[derive(Debug)]
pub enum AreaOutcome {
    /// Output file written with this many points.
    Written { points: u64 },
    /// Nothing fell inside the area, so no file was created.
    Empty,
    /// The area failed; the rest of the run carried on.
    Failed(TilingError),
}

#[derive(Debug)]
pub struct AreaResult {
    pub number: usize,
    pub output: PathBuf,
    pub outcome: AreaOutcome,
}

/// Per-run report, one entry per requested area in request order.
#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub areas: Vec<AreaResult>,
}

impl ExtractionSummary {
    pub fn written(&self) -> usize {
        self.areas
            .iter()
            .filter(|area| matches!(area.outcome, AreaOutcome::Written { .. }))
            .count()
    }

    pub fn empty(&self) -> usize {
        self.areas
            .iter()
            .filter(|area| matches!(area.outcome, AreaOutcome::Empty))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.areas
            .iter()
            .filter(|area| matches!(area.outcome, AreaOutcome::Failed(_)))
            .count()
    }

    pub fn total_points(&self) -> u64 {
        self.areas
            .iter()
            .map(|area| match area.outcome {
                AreaOutcome::Written { points } => points,
                _ => 0,
            })
            .sum()
    }
}

/// Cuts areas out of indexed point files. Inputs are read block-wise via
/// their sidecar indexes; areas are processed in batches so neighbors
/// share loaded blocks, and each batch's buffers are dropped before the
/// next one loads.
pub struct TileExtractor {
    pub output_dir: PathBuf,
    pub tile_size: f64,
    pub margin: f64,
    pub factor: u32,
    /// Batching for grid exports. Polygon and trim areas always run one
    /// to a batch.
    pub batch_mode: BatchMode,
    /// Filter points against the exact area shape. Without it, whole
    /// blocks whose tile touches the area are copied as-is.
    pub exact_filter: bool,
    pub software: String,
    pub progress_step: f64,
    pub notifier: Box<dyn Notifier>,
}

impl TileExtractor {
    pub fn new(output_dir: &Path) -> Self {
        TileExtractor {
            output_dir: output_dir.to_path_buf(),
            tile_size: 1000.0,
            margin: 0.0,
            factor: 1,
            batch_mode: BatchMode::GridRow,
            exact_filter: true,
            software: String::from("lastile"),
            progress_step: 5.0,
            notifier: Box::new(LogNotifier),
        }
    }

    /// Tiles the union extent of `files` into a grid and writes one output
    /// per occupied cell, plus a corner dump of the planned grid.
    pub fn export_grid(&mut self, files: &[PathBuf]) -> Result<ExtractionSummary> {
        let started = Instant::now();
        log::info!("start grid export over {} input files", files.len());

        let sources = Source::open_all(files)?;
        let frame = CommonFrame::from_sources(&sources)?;
        let grid = TileGrid::plan(&frame.extent, self.tile_size, self.factor, 0.0, 0.0);
        log::info!(
            "planned grid: {} rows x {} cols, tile size {}",
            grid.rows,
            grid.cols,
            grid.tile_size
        );

        fs::create_dir_all(&self.output_dir)?;
        let requests = areas::grid_requests(&grid, self.margin, &self.output_dir);
        areas::write_corner_dump(&requests, &self.output_dir.join("lastile_tiling_grid.coo"))?;

        let summary = self.extract(&sources, &frame, requests, self.batch_mode, grid.cols)?;
        log::info!(
            "Finish grid export: {} written, {} empty, {} failed in {:?}",
            summary.written(),
            summary.empty(),
            summary.failed(),
            started.elapsed()
        );
        Ok(summary)
    }

    /// Cuts one polygon area out of `files`.
    pub fn export_polygon(
        &mut self,
        files: &[PathBuf],
        name: &str,
        vertices: Vec<(f64, f64)>,
    ) -> Result<ExtractionSummary> {
        self.export_polygons(files, vec![(name.to_string(), vertices)])
    }

    /// Cuts a list of named polygon areas out of `files`. The configured
    /// margin buffers every polygon outward.
    pub fn export_polygons(
        &mut self,
        files: &[PathBuf],
        polygons: Vec<(String, Vec<(f64, f64)>)>,
    ) -> Result<ExtractionSummary> {
        let started = Instant::now();
        log::info!(
            "start polygon export: {} areas over {} input files",
            polygons.len(),
            files.len()
        );

        let sources = Source::open_all(files)?;
        let frame = CommonFrame::from_sources(&sources)?;
        fs::create_dir_all(&self.output_dir)?;
        let requests: Vec<AreaRequest> = polygons
            .into_iter()
            .enumerate()
            .map(|(number, (name, vertices))| AreaRequest {
                number,
                shape: AreaShape::Polygon(Polygon::new(vertices, self.margin)),
                output: self.output_dir.join(areas::area_file_name(&name)),
            })
            .collect();

        // each polygon forms its own batch regardless of the configured
        // grid batching, so overlapping areas never hold the same block
        // buffers at once
        let summary = self.extract(&sources, &frame, requests, BatchMode::Fixed(1), 1)?;
        log::info!(
            "Finish polygon export: {} written, {} empty, {} failed in {:?}",
            summary.written(),
            summary.empty(),
            summary.failed(),
            started.elapsed()
        );
        Ok(summary)
    }

    /// Shrinks one file by cutting `inset` off every side of its extent.
    pub fn trim(&mut self, file: &Path, inset: f64, name: &str) -> Result<ExtractionSummary> {
        let started = Instant::now();
        log::info!("start trim of {} by {}", file.display(), inset);

        let files = [file.to_path_buf()];
        let sources = Source::open_all(&files)?;
        let frame = CommonFrame::from_sources(&sources)?;
        let rect = Rect::new(
            frame.extent.upper_left_x + inset,
            frame.extent.upper_left_y - inset,
            frame.extent.lower_right_x - inset,
            frame.extent.lower_right_y + inset,
        );

        fs::create_dir_all(&self.output_dir)?;
        let requests = vec![AreaRequest {
            number: 0,
            shape: AreaShape::Rect(rect),
            output: self.output_dir.join(areas::area_file_name(name)),
        }];

        let summary = self.extract(&sources, &frame, requests, BatchMode::Fixed(1), 1)?;
        log::info!(
            "Finish trim: {} points kept in {:?}",
            summary.total_points(),
            started.elapsed()
        );
        Ok(summary)
    }

    fn extract(
        &mut self,
        sources: &[Source],
        frame: &CommonFrame,
        requests: Vec<AreaRequest>,
        mode: BatchMode,
        cols: u32,
    ) -> Result<ExtractionSummary> {
        let total = requests.len();
        let mut completed = 0usize;
        let mut progress = Progress::new(self.progress_step);
        let mut summary = ExtractionSummary::default();

        for batch in areas::batch_requests(requests, mode, cols) {
            let wanted = resolve_blocks(sources, &batch);
            let loaded = load_blocks(sources, &wanted)?;

            for request in batch {
                let outcome = match self.extract_area(&request, sources, frame, &loaded) {
                    Ok(0) => AreaOutcome::Empty,
                    Ok(points) => AreaOutcome::Written { points },
                    Err(error) => {
                        self.notifier
                            .error(&format!("area {} failed: {}", request.number, error));
                        AreaOutcome::Failed(error)
                    }
                };
                summary.areas.push(AreaResult {
                    number: request.number,
                    output: request.output,
                    outcome,
                });
                completed += 1;
                if let Some(percent) = progress.advance(completed as f64 / total as f64 * 100.0)
                {
                    self.notifier.message(&format!(
                        "extracted {} of {} areas: {:.1}%",
                        completed, total, percent
                    ));
                }
            }
            // loaded blocks are released here, before the next batch
        }
        self.notifier.finished();
        Ok(summary)
    }

    fn extract_area(
        &self,
        request: &AreaRequest,
        sources: &[Source],
        frame: &CommonFrame,
        loaded: &[BTreeMap<u64, Vec<las::Point>>],
    ) -> Result<u64> {
        let template = sources
            .first()
            .ok_or_else(|| TilingError::FormatUnsupported("no input files".to_string()))?;
        let bounds = request.shape.bounds();
        let mut writer: Option<PointWriter> = None;
        let mut written: u64 = 0;

        for (source, points_by_start) in sources.iter().zip(loaded) {
            for block in source.index.blocks_overlapping(&bounds) {
                let points = points_by_start.get(&block.start).ok_or_else(|| {
                    TilingError::DataCorruption(format!(
                        "block at {} of {} missing from the batch buffer",
                        block.start,
                        source.path.display()
                    ))
                })?;
                for point in points {
                    if self.exact_filter && !request.shape.contains(point.x, point.y) {
                        continue;
                    }
                    if writer.is_none() {
                        let header = frame.output_header(&template.header, &self.software)?;
                        writer = Some(PointWriter::create(&request.output, header)?);
                    }
                    if let Some(writer) = writer.as_mut() {
                        writer.write_point(point.clone())?;
                        written += 1;
                    }
                }
            }
        }

        if let Some(writer) = writer {
            writer.close()?;
        }
        Ok(written)
    }
}

/// Blocks each source must load for a batch, keyed by block start so
/// shared blocks load once and reads run in file order.
fn resolve_blocks(sources: &[Source], batch: &[AreaRequest]) -> Vec<BTreeMap<u64, Block>> {
    let mut wanted: Vec<BTreeMap<u64, Block>> = sources.iter().map(|_| BTreeMap::new()).collect();
    for request in batch {
        let bounds = request.shape.bounds();
        for (source, blocks) in sources.iter().zip(wanted.iter_mut()) {
            for block in source.index.blocks_overlapping(&bounds) {
                blocks.insert(block.start, *block);
            }
        }
    }
    wanted
}

fn load_blocks(
    sources: &[Source],
    wanted: &[BTreeMap<u64, Block>],
) -> Result<Vec<BTreeMap<u64, Vec<las::Point>>>> {
    let mut loaded = Vec::with_capacity(sources.len());
    for (source, blocks) in sources.iter().zip(wanted) {
        let mut points = BTreeMap::new();
        if !blocks.is_empty() {
            let mut reader = BlockReader::open(&source.path)?;
            for (start, block) in blocks {
                points.insert(*start, reader.read_block(block)?);
            }
        }
        loaded.push(points);
    }
    Ok(loaded)
}
