//! File resolution and bounded content extraction

mod locator;
mod reader;

pub use locator::{FileLocator, ResolvedFile};
pub use reader::ContentReader;
