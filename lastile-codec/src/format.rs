use std::ffi::OsStr;
use std::path::Path;

use las::{Header, Version};

use lastile_core::error::{Result, TilingError};

/// Highest point-record format id this pipeline accepts.
pub const MAX_POINT_FORMAT: u8 = 10;

/// Rejects paths that are not LAS or LAZ files.
pub fn check_extension(path: &Path) -> Result<()> {
    let supported = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("las") || ext.eq_ignore_ascii_case("laz"))
        .unwrap_or(false);
    if supported {
        Ok(())
    } else {
        Err(TilingError::FormatUnsupported(format!(
            "{}: not a las or laz file",
            path.display()
        )))
    }
}

/// Rejects header versions outside 1.2 through 1.4.
pub fn check_version(header: &Header) -> Result<()> {
    let version = header.version();
    match (version.major, version.minor) {
        (1, 2..=4) => Ok(()),
        (major, minor) => Err(TilingError::FormatUnsupported(format!(
            "LAS version {}.{}",
            major, minor
        ))),
    }
}

/// Validated point-format id of a header.
pub fn format_id(header: &Header) -> Result<u8> {
    let id = header
        .point_format()
        .to_u8()
        .map_err(|e| TilingError::FormatUnsupported(e.to_string()))?;
    if id > MAX_POINT_FORMAT {
        return Err(TilingError::FormatUnsupported(format!(
            "point format {}",
            id
        )));
    }
    Ok(id)
}

/// LAS version able to carry a given point format in fresh outputs.
pub fn version_for_format(format_id: u8) -> Version {
    match format_id {
        0..=3 => Version::new(1, 2),
        4 | 5 => Version::new(1, 3),
        _ => Version::new(1, 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("tile.las")).is_ok());
        assert!(check_extension(Path::new("tile.LAZ")).is_ok());
        assert!(matches!(
            check_extension(Path::new("tile.txt")),
            Err(TilingError::FormatUnsupported(_))
        ));
        assert!(check_extension(Path::new("tile")).is_err());
    }

    #[test]
    fn test_version_for_format() {
        assert_eq!(version_for_format(0), Version::new(1, 2));
        assert_eq!(version_for_format(3), Version::new(1, 2));
        assert_eq!(version_for_format(4), Version::new(1, 3));
        assert_eq!(version_for_format(6), Version::new(1, 4));
        assert_eq!(version_for_format(10), Version::new(1, 4));
    }

    #[test]
    fn test_format_id_accepts_default_header() {
        let header = Header::default();
        assert_eq!(format_id(&header).unwrap(), 0);
    }
}
