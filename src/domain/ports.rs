use crate::domain::model::{CheckResponse, LibrarySystem};
use crate::domain::region::Region;
use crate::utils::error::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
}

/// 文字生成服務
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// 依地區列出圖書館系統
#[async_trait]
pub trait LibraryDirectoryService: Send + Sync {
    async fn libraries_in(&self, region: &Region) -> Result<Vec<LibrarySystem>>;
}

/// 非同步蔵書確認服務：先送出查詢取得 session，再以 session 輪詢
#[async_trait]
pub trait AvailabilityService: Send + Sync {
    async fn start_check(&self, isbn: &str, system_ids: &[String]) -> Result<CheckResponse>;
    async fn poll(&self, session_token: &str) -> Result<CheckResponse>;
}

/// 從自由文字中擷取 ISBN 的策略
pub trait IsbnExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, text: &str) -> Option<String>;
}
