//! Content module - pages and the file system they are read from

mod fs;
mod page;

pub use fs::{FileSystem, LocalFileSystem};
pub use page::{Page, PageError};
