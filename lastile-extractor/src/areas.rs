use std::fs;
use std::path::{Path, PathBuf};

use lastile_core::error::Result;
use lastile_core::geom::{AreaShape, Rect};
use lastile_core::grid::TileGrid;

/// One extraction order: a shape to cut and the file to write it to.
#[derive(Debug, Clone)]
pub struct AreaRequest {
    pub number: usize,
    pub shape: AreaShape,
    pub output: PathBuf,
}

/// How extraction groups areas into batches that share loaded blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// One batch per grid row, so neighboring tiles reuse the same blocks.
    GridRow,
    /// Fixed number of areas per batch.
    Fixed(usize),
}

/// Output name for a grid tile, derived from its north-west corner.
pub fn grid_tile_name(number: usize, rect: &Rect) -> String {
    format!(
        "T{}_E{:.0}_N{:.0}.las",
        number, rect.upper_left_x, rect.upper_left_y
    )
}

/// Free-form area names get the point file extension when missing.
pub fn area_file_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".las") || lower.ends_with(".laz") {
        name.to_string()
    } else {
        format!("{}.las", name)
    }
}

/// Row-major requests for every cell of a planned grid, each expanded by
/// `margin` on all sides.
pub fn grid_requests(grid: &TileGrid, margin: f64, output_dir: &Path) -> Vec<AreaRequest> {
    let mut requests = Vec::with_capacity(grid.rows as usize * grid.cols as usize);
    let mut number = 0;
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let rect = grid.cell_rect(row, col).expanded(margin);
            let output = output_dir.join(grid_tile_name(number, &rect));
            requests.push(AreaRequest {
                number,
                shape: AreaShape::Rect(rect),
                output,
            });
            number += 1;
        }
    }
    requests
}

/// Writes the corner rings of all requests for plotting, one ring per
/// area: the four corners closed back to the first, then a blank line.
pub fn write_corner_dump(requests: &[AreaRequest], path: &Path) -> Result<()> {
    let mut body = String::new();
    for request in requests {
        let bounds = request.shape.bounds();
        let ring = [
            (bounds.upper_left_x, bounds.upper_left_y),
            (bounds.lower_right_x, bounds.upper_left_y),
            (bounds.lower_right_x, bounds.lower_right_y),
            (bounds.upper_left_x, bounds.lower_right_y),
            (bounds.upper_left_x, bounds.upper_left_y),
        ];
        for (east, north) in ring {
            body.push_str(&format!("{:.4} {:.4} 0.0\n", east, north));
        }
        body.push('\n');
    }
    fs::write(path, body)?;
    Ok(())
}

/// Splits requests into batches. `cols` is the grid width used by
/// row-wise batching; free-form area lists pass their own width.
pub fn batch_requests(
    requests: Vec<AreaRequest>,
    mode: BatchMode,
    cols: u32,
) -> Vec<Vec<AreaRequest>> {
    let size = match mode {
        BatchMode::GridRow => cols.max(1) as usize,
        BatchMode::Fixed(count) => count.max(1),
    };
    let mut batches = Vec::new();
    let mut current = Vec::with_capacity(size);
    for request in requests {
        current.push(request);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
