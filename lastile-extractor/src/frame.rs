use las::{Builder, Header, Transform, Vector};

use lastile_codec::format;
use lastile_core::error::{Result, TilingError};
use lastile_core::geom::Rect;

use crate::source::Source;

/// Common coordinate frame for a set of sources: the union of their
/// extents and the finest quantization any of them carries. Outputs cut
/// from several files share one header derived from this frame.
pub struct CommonFrame {
    pub extent: Rect,
    pub min_z: f64,
    pub max_z: f64,
    pub transforms: Vector<Transform>,
    pub point_format_id: u8,
}

impl CommonFrame {
    pub fn from_sources(sources: &[Source]) -> Result<CommonFrame> {
        let first = sources
            .first()
            .ok_or_else(|| TilingError::FormatUnsupported("no input files".to_string()))?;

        let point_format_id = format::format_id(&first.header)?;
        let bounds = first.header.bounds();
        let transforms = first.header.transforms();
        let mut frame = CommonFrame {
            extent: Rect::from_extent(bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y),
            min_z: bounds.min.z,
            max_z: bounds.max.z,
            transforms: Vector {
                x: transforms.x,
                y: transforms.y,
                z: transforms.z,
            },
            point_format_id,
        };

        for source in &sources[1..] {
            let id = format::format_id(&source.header)?;
            if id != point_format_id {
                return Err(TilingError::FormatUnsupported(format!(
                    "mixed point formats {} and {} across inputs",
                    point_format_id, id
                )));
            }
            let bounds = source.header.bounds();
            frame.extent.upper_left_x = frame.extent.upper_left_x.min(bounds.min.x);
            frame.extent.upper_left_y = frame.extent.upper_left_y.max(bounds.max.y);
            frame.extent.lower_right_x = frame.extent.lower_right_x.max(bounds.max.x);
            frame.extent.lower_right_y = frame.extent.lower_right_y.min(bounds.min.y);
            frame.min_z = frame.min_z.min(bounds.min.z);
            frame.max_z = frame.max_z.max(bounds.max.z);
            let transforms = source.header.transforms();
            frame.transforms.x = finer(frame.transforms.x, transforms.x);
            frame.transforms.y = finer(frame.transforms.y, transforms.y);
            frame.transforms.z = finer(frame.transforms.z, transforms.z);
        }
        Ok(frame)
    }

    /// Header for output files cut in this frame. Counts and bounds start
    /// empty; VLRs carry over from `template` minus any compression VLR.
    pub fn output_header(&self, template: &Header, software: &str) -> Result<Header> {
        let mut builder = Builder::from(format::version_for_format(self.point_format_id));
        builder.point_format = las::point::Format::new(self.point_format_id)?;
        builder.transforms = Vector {
            x: self.transforms.x,
            y: self.transforms.y,
            z: self.transforms.z,
        };
        builder.generating_software = software.to_string();
        builder.vlrs = template
            .vlrs()
            .iter()
            .filter(|vlr| !vlr.user_id.eq_ignore_ascii_case("laszip encoded"))
            .cloned()
            .collect();
        let header = builder.into_header()?;
        Ok(header)
    }
}

/// The transform with the smaller scale wins; offsets take the
/// component-wise minimum so every source coordinate stays representable.
fn finer(a: Transform, b: Transform) -> Transform {
    Transform {
        scale: a.scale.min(b.scale),
        offset: a.offset.min(b.offset),
    }
}
