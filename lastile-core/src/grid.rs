use crate::geom::Rect;

/// Planned tile layout. The origin is the upper-left corner of cell
/// (0, 0); rows count southward, columns eastward. The grid always covers
/// the planned extent with whole tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub tile_size: f64,
    pub origin_east: f64,
    pub origin_north: f64,
    pub rows: u32,
    pub cols: u32,
}

/// Maps a coordinate to its grid cell.
///
/// Boundary rule: an east coordinate lying exactly on a cell edge belongs
/// to the cell starting at that edge; a north coordinate on a cell edge
/// snaps to the cell below it. Results may be negative or past the grid
/// for coordinates outside the planned extent.
pub fn row_col(
    east: f64,
    north: f64,
    origin_east: f64,
    origin_north: f64,
    size_x: f64,
    size_y: f64,
) -> (i64, i64) {
    let adjusted_east = if east % size_x == 0.0 {
        east
    } else {
        east - east % size_x
    };
    let adjusted_north = if north % size_y == 0.0 {
        north
    } else {
        north + (size_y - north % size_y)
    };
    let row = ((origin_north - adjusted_north) / size_y).round() as i64;
    let col = ((adjusted_east - origin_east) / size_x).round() as i64;
    (row, col)
}

impl TileGrid {
    /// Plans a grid over `extent` snapped outward to whole multiples of
    /// `tile_size * factor`. A maximum corner already on a multiple still
    /// gains one full step, so coverage never loses an edge point. The
    /// adjustments shift the extent before snapping.
    pub fn plan(extent: &Rect, tile_size: f64, factor: u32, x_adjust: f64, y_adjust: f64) -> Self {
        let snap = tile_size * factor.max(1) as f64;
        let min_x = extent.upper_left_x + x_adjust;
        let max_x = extent.lower_right_x + x_adjust;
        let min_y = extent.lower_right_y + y_adjust;
        let max_y = extent.upper_left_y + y_adjust;

        let snapped_min_x = min_x - min_x % snap;
        let snapped_max_x = max_x - max_x % snap + snap;
        let snapped_min_y = min_y - min_y % snap;
        let snapped_max_y = max_y - max_y % snap + snap;

        TileGrid {
            tile_size,
            origin_east: snapped_min_x,
            origin_north: snapped_max_y,
            rows: ((snapped_max_y - snapped_min_y) / tile_size).round() as u32,
            cols: ((snapped_max_x - snapped_min_x) / tile_size).round() as u32,
        }
    }

    /// Raw cell for a coordinate, before clamping.
    pub fn locate(&self, east: f64, north: f64) -> (i64, i64) {
        row_col(
            east,
            north,
            self.origin_east,
            self.origin_north,
            self.tile_size,
            self.tile_size,
        )
    }

    /// Cell for a coordinate, clamped per axis into the valid range so
    /// boundary drift outside the planned grid lands in the nearest edge
    /// cell.
    pub fn clamped_cell(&self, east: f64, north: f64) -> (u32, u32) {
        let (row, col) = self.locate(east, north);
        let max_row = i64::from(self.rows).saturating_sub(1);
        let max_col = i64::from(self.cols).saturating_sub(1);
        (
            row.clamp(0, max_row) as u32,
            col.clamp(0, max_col) as u32,
        )
    }

    /// Upper-left corner of a cell, in whole grid units.
    pub fn cell_corner(&self, row: u32, col: u32) -> (i64, i64) {
        (
            (self.origin_east + f64::from(col) * self.tile_size) as i64,
            (self.origin_north - f64::from(row) * self.tile_size) as i64,
        )
    }

    /// Footprint rectangle of a cell.
    pub fn cell_rect(&self, row: u32, col: u32) -> Rect {
        let east = self.origin_east + f64::from(col) * self.tile_size;
        let north = self.origin_north - f64::from(row) * self.tile_size;
        Rect::new(east, north, east + self.tile_size, north - self.tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_col_interior_point() {
        assert_eq!(row_col(150.0, 950.0, 0.0, 1000.0, 100.0, 100.0), (0, 1));
    }

    #[test]
    fn test_row_col_boundary_rule() {
        // east on a cell edge belongs to the cell starting there
        assert_eq!(row_col(100.0, 950.0, 0.0, 1000.0, 100.0, 100.0), (0, 1));
        // north on a cell edge snaps to the cell below
        assert_eq!(row_col(50.0, 900.0, 0.0, 1000.0, 100.0, 100.0), (1, 0));
        assert_eq!(row_col(50.0, 1000.0, 0.0, 1000.0, 100.0, 100.0), (0, 0));
    }

    #[test]
    fn test_row_col_outside_grid() {
        // a negative east has a negative remainder, so -50 snaps toward
        // zero and stays in the column starting at the origin
        assert_eq!(row_col(-50.0, 1200.0, 0.0, 1000.0, 100.0, 100.0), (-2, 0));
        assert_eq!(row_col(-150.0, 1200.0, 0.0, 1000.0, 100.0, 100.0), (-2, -1));
    }

    #[test]
    fn test_plan_snaps_outward() {
        let extent = Rect::from_extent(50.0, 50.0, 150.0, 150.0);
        let grid = TileGrid::plan(&extent, 100.0, 1, 0.0, 0.0);
        assert_eq!(grid.origin_east, 0.0);
        assert_eq!(grid.origin_north, 200.0);
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.cols, 2);
    }

    #[test]
    fn test_plan_exact_multiple_gains_a_step() {
        let extent = Rect::from_extent(0.0, 0.0, 200.0, 200.0);
        let grid = TileGrid::plan(&extent, 100.0, 1, 0.0, 0.0);
        assert_eq!(grid.origin_north, 300.0);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.cols, 3);
    }

    #[test]
    fn test_plan_with_factor() {
        let extent = Rect::from_extent(250.0, 250.0, 350.0, 350.0);
        let grid = TileGrid::plan(&extent, 100.0, 2, 0.0, 0.0);
        assert_eq!(grid.origin_east, 200.0);
        assert_eq!(grid.origin_north, 400.0);
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.cols, 2);
    }

    #[test]
    fn test_plan_applies_adjustments() {
        let extent = Rect::from_extent(40.0, 40.0, 140.0, 140.0);
        let grid = TileGrid::plan(&extent, 100.0, 1, 10.0, 10.0);
        assert_eq!(grid.origin_east, 0.0);
        assert_eq!(grid.origin_north, 200.0);
    }

    #[test]
    fn test_clamped_cell() {
        let grid = TileGrid {
            tile_size: 100.0,
            origin_east: 0.0,
            origin_north: 1000.0,
            rows: 10,
            cols: 10,
        };
        assert_eq!(grid.clamped_cell(150.0, 950.0), (0, 1));
        // outside the planned grid falls into the nearest edge cell
        assert_eq!(grid.clamped_cell(-50.0, 1100.0), (0, 0));
        assert_eq!(grid.clamped_cell(1500.0, -100.0), (9, 9));
    }

    #[test]
    fn test_cell_geometry() {
        let grid = TileGrid {
            tile_size: 100.0,
            origin_east: 0.0,
            origin_north: 1000.0,
            rows: 10,
            cols: 10,
        };
        assert_eq!(grid.cell_corner(0, 1), (100, 1000));
        assert_eq!(grid.cell_corner(2, 0), (0, 800));
        assert_eq!(
            grid.cell_rect(0, 1),
            Rect::new(100.0, 1000.0, 200.0, 900.0)
        );
    }
}
