use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use las::{Header, Point, Writer};

use lastile_core::error::Result;

/// Streams points into a new LAS file. The header written at creation is
/// a placeholder; closing rewrites it with the final counts and extents.
pub struct PointWriter {
    path: PathBuf,
    writer: Writer<BufWriter<File>>,
}

impl PointWriter {
    pub fn create(path: &Path, header: Header) -> Result<Self> {
        let mut header = header;
        header.clear();
        let writer = Writer::from_path(path, header)?;
        Ok(PointWriter {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Running header as accumulated so far.
    pub fn header(&self) -> &Header {
        self.writer.header()
    }

    pub fn write_point(&mut self, point: Point) -> Result<()> {
        self.writer.write_point(point)?;
        Ok(())
    }

    pub fn write_points(&mut self, points: &[Point]) -> Result<()> {
        for point in points {
            self.writer.write_point(point.clone())?;
        }
        Ok(())
    }

    /// Finalizes the header and closes the file.
    pub fn close(mut self) -> Result<()> {
        self.writer.close()?;
        Ok(())
    }
}
