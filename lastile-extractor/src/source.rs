use std::path::{Path, PathBuf};

use las::Header;

use lastile_codec::PointReader;
use lastile_core::error::{Result, TilingError};
use lastile_core::index::TileIndex;

/// One indexed input file: a header snapshot plus the sidecar tile index.
pub struct Source {
    pub path: PathBuf,
    pub header: Header,
    pub index: TileIndex,
}

impl Source {
    /// Opens the point file, applies the format gates, and loads the
    /// sidecar index.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = PointReader::open(path)?;
        let header = reader.header().clone();
        let sidecar = TileIndex::sidecar_path(path);
        if !sidecar.exists() {
            return Err(TilingError::MissingIndex(path.to_path_buf()));
        }
        let index = TileIndex::load(&sidecar)?;
        Ok(Source {
            path: path.to_path_buf(),
            header,
            index,
        })
    }

    pub fn open_all(paths: &[PathBuf]) -> Result<Vec<Source>> {
        paths.iter().map(|path| Source::open(path)).collect()
    }
}
