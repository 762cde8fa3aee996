pub mod error;
pub mod geom;
pub mod grid;
pub mod index;
pub mod progress;
