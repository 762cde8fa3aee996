pub mod areas;
pub mod extract;
pub mod frame;
pub mod source;

pub use areas::{AreaRequest, BatchMode};
pub use extract::{AreaOutcome, AreaResult, ExtractionSummary, TileExtractor};
pub use frame::CommonFrame;
pub use source::Source;
