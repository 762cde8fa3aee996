use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TilingError};
use crate::geom::Rect;
use crate::grid::TileGrid;

/// A contiguous run of points in an indexed file, owned by one tile. A
/// tile may own several blocks when its cell filled and flushed more than
/// once during the build pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub row: u32,
    pub col: u32,
    pub east: i64,
    pub north: i64,
    pub start: u64,
    pub count: u64,
    #[serde(default)]
    pub deleted: bool,
}

/// Grid description persisted alongside the blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    pub tile_size: f64,
    pub rows: u32,
    pub cols: u32,
}

/// Sidecar tile index for one point file. Built once, immutable
/// afterward; all queries skip blocks marked deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileIndex {
    pub tile_info: TileInfo,
    pub blocks: Vec<Block>,
}

impl TileIndex {
    /// Empty index shell for a freshly planned grid.
    pub fn new(grid: &TileGrid) -> Self {
        TileIndex {
            tile_info: TileInfo {
                tile_size: grid.tile_size,
                rows: grid.rows,
                cols: grid.cols,
            },
            blocks: Vec::new(),
        }
    }

    fn footprint(&self, block: &Block) -> Rect {
        let east = block.east as f64;
        let north = block.north as f64;
        Rect::new(
            east,
            north,
            east + self.tile_info.tile_size,
            north - self.tile_info.tile_size,
        )
    }

    /// Linear scan for blocks whose tile footprint overlaps the query.
    pub fn blocks_overlapping(&self, query: &Rect) -> Vec<&Block> {
        self.blocks
            .iter()
            .filter(|block| !block.deleted && self.footprint(block).has_overlap(query))
            .collect()
    }

    /// Total points stored for one tile across all of its blocks.
    pub fn point_count_for_tile(&self, row: u32, col: u32) -> u64 {
        self.blocks
            .iter()
            .filter(|block| !block.deleted && block.row == row && block.col == col)
            .map(|block| block.count)
            .sum()
    }

    /// Bounding box spanned by the live block corners, if any.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut corners = self
            .blocks
            .iter()
            .filter(|block| !block.deleted)
            .map(|block| (block.east as f64, block.north as f64));
        let (first_east, first_north) = corners.next()?;
        let mut min_east = first_east;
        let mut max_east = first_east;
        let mut min_north = first_north;
        let mut max_north = first_north;
        for (east, north) in corners {
            min_east = min_east.min(east);
            max_east = max_east.max(east);
            min_north = min_north.min(north);
            max_north = max_north.max(north);
        }
        Some(Rect::new(min_east, max_north, max_east, min_north))
    }

    pub fn has_overlap(&self, query: &Rect) -> bool {
        self.bounding_box()
            .map(|bbox| bbox.has_overlap(query))
            .unwrap_or(false)
    }

    /// Sidecar location for a point file: same directory and stem, `json`
    /// extension.
    pub fn sidecar_path(source: &Path) -> PathBuf {
        source.with_extension("json")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| TilingError::DataCorruption(format!("tile index encode: {}", e)))?;
        fs::write(path, body)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TilingError::FileNotFound(path.to_path_buf()));
        }
        let body = fs::read_to_string(path)?;
        serde_json::from_str(&body)
            .map_err(|e| TilingError::DataCorruption(format!("tile index {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> TileIndex {
        TileIndex {
            tile_info: TileInfo {
                tile_size: 100.0,
                rows: 2,
                cols: 2,
            },
            blocks: vec![
                Block {
                    row: 0,
                    col: 0,
                    east: 0,
                    north: 200,
                    start: 0,
                    count: 10,
                    deleted: false,
                },
                Block {
                    row: 1,
                    col: 1,
                    east: 100,
                    north: 100,
                    start: 10,
                    count: 4,
                    deleted: false,
                },
                Block {
                    row: 0,
                    col: 0,
                    east: 0,
                    north: 200,
                    start: 14,
                    count: 3,
                    deleted: false,
                },
            ],
        }
    }

    #[test]
    fn test_blocks_overlapping() {
        let index = sample_index();
        let hits = index.blocks_overlapping(&Rect::new(10.0, 190.0, 20.0, 180.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|block| block.row == 0 && block.col == 0));

        let all = index.blocks_overlapping(&Rect::new(0.0, 200.0, 200.0, 0.0));
        assert_eq!(all.len(), 3);

        let none = index.blocks_overlapping(&Rect::new(500.0, 200.0, 600.0, 100.0));
        assert!(none.is_empty());
    }

    #[test]
    fn test_point_count_for_tile_sums_blocks() {
        let index = sample_index();
        assert_eq!(index.point_count_for_tile(0, 0), 13);
        assert_eq!(index.point_count_for_tile(1, 1), 4);
        assert_eq!(index.point_count_for_tile(1, 0), 0);
    }

    #[test]
    fn test_deleted_blocks_are_invisible() {
        let mut index = sample_index();
        index.blocks[2].deleted = true;
        assert_eq!(index.point_count_for_tile(0, 0), 10);
        let hits = index.blocks_overlapping(&Rect::new(10.0, 190.0, 20.0, 180.0));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_bounding_box_from_corners() {
        let index = sample_index();
        assert_eq!(
            index.bounding_box(),
            Some(Rect::new(0.0, 200.0, 100.0, 100.0))
        );
        assert!(index.has_overlap(&Rect::new(50.0, 150.0, 60.0, 140.0)));
        assert!(!index.has_overlap(&Rect::new(300.0, 150.0, 400.0, 140.0)));

        let empty = TileIndex {
            tile_info: index.tile_info,
            blocks: Vec::new(),
        };
        assert_eq!(empty.bounding_box(), None);
        assert!(!empty.has_overlap(&Rect::new(0.0, 200.0, 200.0, 0.0)));
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            TileIndex::sidecar_path(Path::new("/data/survey.las")),
            PathBuf::from("/data/survey.json")
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        let index = sample_index();
        index.save(&path).unwrap();
        let loaded = TileIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            TileIndex::load(&missing),
            Err(TilingError::FileNotFound(_))
        ));

        let garbled = dir.path().join("garbled.json");
        fs::write(&garbled, "not json").unwrap();
        assert!(matches!(
            TileIndex::load(&garbled),
            Err(TilingError::DataCorruption(_))
        ));
    }
}
