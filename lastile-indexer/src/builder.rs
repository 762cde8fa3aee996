use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use itertools::Itertools;

use lastile_codec::{PointReader, PointWriter};
use lastile_core::error::Result;
use lastile_core::geom::Rect;
use lastile_core::grid::TileGrid;
use lastile_core::index::{Block, TileIndex};
use lastile_core::progress::{LogNotifier, Notifier, Progress};

const CHUNK_SIZE: u64 = 1_000_000;

/// Builds a tile index for one point file. The input is streamed in
/// chunks, bucketed into grid cells, and rewritten so every block of the
/// output is a contiguous run belonging to a single tile. The index goes
/// into a JSON sidecar next to the output.
pub struct IndexBuilder {
    pub tile_size: f64,
    pub block_size: usize,
    pub factor: u32,
    pub x_adjust: f64,
    pub y_adjust: f64,
    pub z_adjust: f64,
    pub min_clamp_z: f64,
    pub max_clamp_z: f64,
    pub progress_step: f64,
    pub notifier: Box<dyn Notifier>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        IndexBuilder {
            tile_size: 200.0,
            block_size: 20_000,
            factor: 1,
            x_adjust: 0.0,
            y_adjust: 0.0,
            z_adjust: 0.0,
            min_clamp_z: f64::MIN,
            max_clamp_z: f64::MAX,
            progress_step: 5.0,
            notifier: Box::new(LogNotifier),
        }
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    fn plan_grid(&self, header: &las::Header) -> TileGrid {
        let bounds = header.bounds();
        let extent = Rect::from_extent(bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y);
        TileGrid::plan(
            &extent,
            self.tile_size,
            self.factor,
            self.x_adjust,
            self.y_adjust,
        )
    }

    /// Streams `input` into `output` grouped by tile and saves the block
    /// index as a sidecar of `output`.
    pub fn build(&mut self, input: &Path, output: &Path) -> Result<TileIndex> {
        let started = Instant::now();
        log::info!("start indexing {}", input.display());

        let mut reader = PointReader::open(input)?;
        let total = reader.point_count();
        let grid = self.plan_grid(reader.header());
        log::info!(
            "planned grid: {} rows x {} cols, tile size {}",
            grid.rows,
            grid.cols,
            grid.tile_size
        );

        let mut index = TileIndex::new(&grid);
        let header = reader.header().clone();
        let mut writer = PointWriter::create(output, header)?;

        let mut cells: HashMap<(u32, u32), Vec<las::Point>> = HashMap::new();
        let mut written: u64 = 0;
        let mut streamed: u64 = 0;
        let mut dropped: u64 = 0;
        let mut progress = Progress::new(self.progress_step);

        loop {
            let chunk = reader.read_chunk(CHUNK_SIZE)?;
            if chunk.is_empty() {
                break;
            }
            streamed += chunk.len() as u64;
            for mut point in chunk {
                point.x += self.x_adjust;
                point.y += self.y_adjust;
                point.z = (point.z + self.z_adjust).clamp(self.min_clamp_z, self.max_clamp_z);
                // scanner nulls sit at or below the axes
                if point.x <= 0.0 || point.y <= 0.0 {
                    dropped += 1;
                    continue;
                }
                let cell = grid.clamped_cell(point.x, point.y);
                let buffer = cells
                    .entry(cell)
                    .or_insert_with(|| Vec::with_capacity(self.block_size));
                buffer.push(point);
                let full = buffer.len() >= self.block_size;
                if full {
                    if let Some(points) = cells.remove(&cell) {
                        written +=
                            flush_block(&mut writer, &mut index, &grid, cell, &points, written)?;
                    }
                }
            }
            if total > 0 {
                let percent = streamed as f64 / total as f64 * 100.0;
                if let Some(percent) = progress.advance(percent) {
                    self.notifier.message(&format!(
                        "indexing {}: {:.1}% streamed",
                        input.display(),
                        percent
                    ));
                }
            }
        }

        // drain leftovers in a stable order so rebuilds are reproducible
        for (cell, points) in cells.into_iter().sorted_by_key(|(cell, _)| *cell) {
            written += flush_block(&mut writer, &mut index, &grid, cell, &points, written)?;
        }
        writer.close()?;

        index.save(&TileIndex::sidecar_path(output))?;

        if dropped > 0 {
            log::warn!("dropped {} points with non-positive coordinates", dropped);
        }
        log::info!(
            "Finish indexing {} points into {} blocks in {:?}",
            written,
            index.blocks.len(),
            started.elapsed()
        );
        self.notifier.finished();
        Ok(index)
    }
}

fn flush_block(
    writer: &mut PointWriter,
    index: &mut TileIndex,
    grid: &TileGrid,
    cell: (u32, u32),
    points: &[las::Point],
    written: u64,
) -> Result<u64> {
    if points.is_empty() {
        return Ok(0);
    }
    writer.write_points(points)?;
    let (east, north) = grid.cell_corner(cell.0, cell.1);
    index.blocks.push(Block {
        row: cell.0,
        col: cell.1,
        east,
        north,
        start: written,
        count: points.len() as u64,
        deleted: false,
    });
    Ok(points.len() as u64)
}
