use crate::core::retry::RetryPolicy;
use crate::domain::model::LibraryDirectory;
use crate::domain::ports::LibraryDirectoryService;
use crate::domain::region::Region;
use crate::utils::error::{EhonError, Result};
use std::sync::Arc;

/// 查詢地區內的圖書館系統。空結果是合法值，呼叫失敗才回傳 Err。
pub struct RegionDirectory {
    service: Arc<dyn LibraryDirectoryService>,
    retry: RetryPolicy,
}

impl RegionDirectory {
    pub fn new(service: Arc<dyn LibraryDirectoryService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    pub async fn lookup(&self, region: &Region) -> Result<LibraryDirectory> {
        let systems = self
            .retry
            .execute_when(
                "library directory lookup",
                |_| self.service.libraries_in(region),
                EhonError::is_transient,
            )
            .await
            .into_result()?;

        let directory = LibraryDirectory::from_systems(region.clone(), systems);
        if directory.is_empty() {
            tracing::info!("🏚️ No library systems registered in {}", region);
        } else {
            tracing::info!("🏛️ {} library systems found in {}", directory.len(), region);
        }
        Ok(directory)
    }
}
