//! Input document sources.

mod local;

pub use local::GlobSource;
