pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command};

pub use adapters::{CalilClient, PerplexityClient};
pub use app::LookupSession;
pub use config::AppConfig;
pub use core::{
    catalog::Catalog, describe::BookDescriber, directory::RegionDirectory, isbn::IsbnResolver,
    locator::LibraryLocator, poller::AvailabilityPoller, retry::RetryPolicy,
};
pub use domain::region::Region;
pub use utils::error::{EhonError, Result};
