pub mod builder;

pub use builder::IndexBuilder;
