pub mod format;
pub mod reader;
pub mod writer;

pub use reader::{BlockReader, PointReader};
pub use writer::PointWriter;
