pub mod catalog;
pub mod classifier;
pub mod describe;
pub mod directory;
pub mod isbn;
pub mod locator;
pub mod poller;
pub mod retry;

pub use crate::domain::ports::{AvailabilityService, LibraryDirectoryService, TextGenerator};
pub use crate::utils::error::Result;
