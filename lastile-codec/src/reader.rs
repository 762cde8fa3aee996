use std::path::{Path, PathBuf};

use las::{Header, Point, Reader};

use lastile_core::error::{Result, TilingError};
use lastile_core::index::Block;

use crate::format;

/// Sequential reader over one LAS/LAZ file with the format gates applied
/// at open time.
pub struct PointReader {
    path: PathBuf,
    reader: Reader,
}

impl PointReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TilingError::FileNotFound(path.to_path_buf()));
        }
        format::check_extension(path)?;
        let reader = Reader::from_path(path)?;
        format::check_version(reader.header())?;
        format::format_id(reader.header())?;
        Ok(PointReader {
            path: path.to_path_buf(),
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        self.reader.header()
    }

    pub fn point_count(&self) -> u64 {
        self.reader.header().number_of_points()
    }

    /// Reads up to `count` points from the current position; an empty
    /// result marks the end of the stream.
    pub fn read_chunk(&mut self, count: u64) -> Result<Vec<Point>> {
        let mut points = Vec::new();
        for entry in self.reader.points().take(count as usize) {
            points.push(entry?);
        }
        Ok(points)
    }

    /// Positions the stream so the next read returns point `index`.
    pub fn seek_to_point(&mut self, index: u64) -> Result<()> {
        self.reader.seek(index)?;
        Ok(())
    }
}

/// Random-access reads of indexed blocks from one file.
pub struct BlockReader {
    inner: PointReader,
}

impl BlockReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(BlockReader {
            inner: PointReader::open(path)?,
        })
    }

    pub fn header(&self) -> &Header {
        self.inner.header()
    }

    /// Reads exactly `block.count` points starting at `block.start`.
    pub fn read_block(&mut self, block: &Block) -> Result<Vec<Point>> {
        let total = self.inner.point_count();
        if block.start + block.count > total {
            return Err(TilingError::DataCorruption(format!(
                "block [{}..{}) exceeds the {} points in {}",
                block.start,
                block.start + block.count,
                total,
                self.inner.path().display()
            )));
        }
        self.inner.seek_to_point(block.start)?;
        let points = self.inner.read_chunk(block.count)?;
        if points.len() as u64 != block.count {
            return Err(TilingError::DataCorruption(format!(
                "short read in {}: wanted {} points at {}, got {}",
                self.inner.path().display(),
                block.count,
                block.start,
                points.len()
            )));
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(path: &Path, count: usize) {
        let mut builder = las::Builder::from((1, 2));
        builder.transforms = las::Vector {
            x: las::Transform {
                scale: 0.001,
                offset: 0.0,
            },
            y: las::Transform {
                scale: 0.001,
                offset: 0.0,
            },
            z: las::Transform {
                scale: 0.001,
                offset: 0.0,
            },
        };
        let header = builder.into_header().unwrap();
        let mut writer = las::Writer::from_path(path, header).unwrap();
        for i in 0..count {
            let point = las::Point {
                x: 1.0 + i as f64,
                y: 2.0 + i as f64,
                z: 0.5,
                return_number: 1,
                number_of_returns: 1,
                ..Default::default()
            };
            writer.write_point(point).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PointReader::open(&dir.path().join("absent.las"));
        assert!(matches!(result, Err(TilingError::FileNotFound(_))));
    }

    #[test]
    fn test_open_rejects_foreign_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.txt");
        std::fs::write(&path, "plain text").unwrap();
        let result = PointReader::open(&path);
        assert!(matches!(result, Err(TilingError::FormatUnsupported(_))));
    }

    #[test]
    fn test_read_chunk_walks_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.las");
        write_fixture(&path, 10);

        let mut reader = PointReader::open(&path).unwrap();
        assert_eq!(reader.point_count(), 10);
        assert_eq!(reader.read_chunk(4).unwrap().len(), 4);
        assert_eq!(reader.read_chunk(4).unwrap().len(), 4);
        let tail = reader.read_chunk(4).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(reader.read_chunk(4).unwrap().is_empty());
    }

    #[test]
    fn test_block_reader_reads_a_middle_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.las");
        write_fixture(&path, 10);

        let block = Block {
            row: 0,
            col: 0,
            east: 0,
            north: 0,
            start: 3,
            count: 4,
            deleted: false,
        };
        let mut reader = BlockReader::open(&path).unwrap();
        let points = reader.read_block(&block).unwrap();
        assert_eq!(points.len(), 4);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.x, 4.0 + i as f64);
        }
    }

    #[test]
    fn test_block_reader_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.las");
        write_fixture(&path, 10);

        let block = Block {
            row: 0,
            col: 0,
            east: 0,
            north: 0,
            start: 8,
            count: 5,
            deleted: false,
        };
        let mut reader = BlockReader::open(&path).unwrap();
        assert!(matches!(
            reader.read_block(&block),
            Err(TilingError::DataCorruption(_))
        ));
    }
}
