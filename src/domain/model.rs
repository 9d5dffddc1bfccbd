use crate::domain::ordered::OrderedMap;
use crate::domain::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 使用者選定的繪本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookIdentity {
    pub title: String,
    pub author: String,
    pub catalog_isbn: String,
}

impl BookIdentity {
    pub fn new(title: impl Into<String>, author: impl Into<String>, catalog_isbn: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            catalog_isbn: catalog_isbn.into(),
        }
    }

    /// 摘要快取所用的鍵
    pub fn cache_key(&self) -> (String, String) {
        (self.title.clone(), self.author.clone())
    }
}

/// 目錄中的一筆繪本資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub price: Option<u32>,
    pub release_date: Option<String>,
    pub review_score: f64,
    pub image_url: Option<String>,
    pub purchase_url: Option<String>,
    pub keywords: HashSet<String>,
}

impl CatalogBook {
    pub fn identity(&self) -> BookIdentity {
        BookIdentity::new(&self.title, &self.author, &self.isbn)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySystem {
    pub system_id: String,
    pub system_name: String,
    pub region: Region,
}

/// 一個地區內的圖書館系統一覽（已去重）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDirectory {
    pub region: Region,
    pub system_ids: Vec<String>,
    names: HashMap<String, String>,
}

impl LibraryDirectory {
    pub fn from_systems(region: Region, systems: Vec<LibrarySystem>) -> Self {
        let mut system_ids = Vec::new();
        let mut names = HashMap::new();

        for system in systems {
            if !names.contains_key(&system.system_id) {
                system_ids.push(system.system_id.clone());
                names.insert(system.system_id, system.system_name);
            }
        }

        Self {
            region,
            system_ids,
            names,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.system_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.system_ids.len()
    }

    /// 找不到名稱時退回系統 ID
    pub fn system_name<'a>(&'a self, system_id: &'a str) -> &'a str {
        self.names.get(system_id).map(String::as_str).unwrap_or(system_id)
    }
}

/// 單一館的藏書狀態
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldingStatus {
    Loanable,
    InStock,
    LibraryUseOnly,
    OnLoan,
    Reserved,
    Preparing,
    Closed,
    Absent,
    Error,
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingCategory {
    AvailableNow,
    Limited,
    Dropped,
    Unrecognized,
}

impl HoldingStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "貸出可" => HoldingStatus::Loanable,
            "蔵書あり" => HoldingStatus::InStock,
            "館内のみ" => HoldingStatus::LibraryUseOnly,
            "貸出中" => HoldingStatus::OnLoan,
            "予約中" => HoldingStatus::Reserved,
            "準備中" => HoldingStatus::Preparing,
            "休館中" => HoldingStatus::Closed,
            "蔵書なし" => HoldingStatus::Absent,
            "Error" => HoldingStatus::Error,
            other => HoldingStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            HoldingStatus::Loanable => "貸出可",
            HoldingStatus::InStock => "蔵書あり",
            HoldingStatus::LibraryUseOnly => "館内のみ",
            HoldingStatus::OnLoan => "貸出中",
            HoldingStatus::Reserved => "予約中",
            HoldingStatus::Preparing => "準備中",
            HoldingStatus::Closed => "休館中",
            HoldingStatus::Absent => "蔵書なし",
            HoldingStatus::Error => "Error",
            HoldingStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn category(&self) -> HoldingCategory {
        match self {
            HoldingStatus::Loanable | HoldingStatus::InStock => HoldingCategory::AvailableNow,
            HoldingStatus::LibraryUseOnly
            | HoldingStatus::OnLoan
            | HoldingStatus::Reserved
            | HoldingStatus::Preparing
            | HoldingStatus::Closed => HoldingCategory::Limited,
            HoldingStatus::Absent | HoldingStatus::Error => HoldingCategory::Dropped,
            HoldingStatus::Unrecognized(_) => HoldingCategory::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStatus {
    pub library_name: String,
    pub status: HoldingStatus,
}

/// 圖書館系統層級的處理狀態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemCheckStatus {
    Ok,
    Cache,
    Running,
    Error,
    Other(String),
}

impl SystemCheckStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => SystemCheckStatus::Ok,
            "Cache" => SystemCheckStatus::Cache,
            "Running" => SystemCheckStatus::Running,
            "Error" => SystemCheckStatus::Error,
            other => SystemCheckStatus::Other(other.to_string()),
        }
    }

    /// OK 與 Cache 代表該系統已回報完畢
    pub fn is_finished(&self) -> bool {
        matches!(self, SystemCheckStatus::Ok | SystemCheckStatus::Cache)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemReport {
    pub status: SystemCheckStatus,
    pub reserve_url: Option<String>,
    pub holdings: Vec<LibraryStatus>,
}

/// 蔵書確認 API 的一次回應（初次請求或輪詢）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckResponse {
    pub session_token: String,
    pub continue_polling: bool,
    /// isbn → system_id → 報告，保留上游回應的順序
    pub books: OrderedMap<OrderedMap<SystemReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemAvailability {
    pub system_id: String,
    pub report: SystemReport,
    /// 寫入此筆資料的回應輪次（0 = 初次請求）
    pub round: u32,
}

#[derive(Debug, Clone)]
pub struct AvailabilitySession {
    pub session_token: String,
    pub isbn: String,
    pub system_ids: Vec<String>,
    pub done: bool,
    pub polls: u32,
    results: Vec<SystemAvailability>,
    positions: HashMap<String, usize>,
}

impl AvailabilitySession {
    pub fn new(session_token: String, isbn: String, system_ids: Vec<String>) -> Self {
        Self {
            session_token,
            isbn,
            system_ids,
            done: false,
            polls: 0,
            results: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// 依首次出現的順序排列
    pub fn results(&self) -> &[SystemAvailability] {
        &self.results
    }

    pub fn result_for(&self, system_id: &str) -> Option<&SystemAvailability> {
        self.positions.get(system_id).map(|&index| &self.results[index])
    }

    /// 合併一次回應。已存在的系統只會被更新輪次的回應覆寫，
    /// 回傳實際寫入的系統數。
    pub fn merge(&mut self, response: &CheckResponse, round: u32) -> usize {
        let Some(systems) = response.books.get(&self.isbn) else {
            return 0;
        };

        let mut written = 0;
        for (system_id, report) in systems.iter() {
            match self.positions.get(system_id) {
                Some(&index) => {
                    let existing = &mut self.results[index];
                    if round > existing.round {
                        existing.report = report.clone();
                        existing.round = round;
                        written += 1;
                    }
                }
                None => {
                    self.positions.insert(system_id.to_string(), self.results.len());
                    self.results.push(SystemAvailability {
                        system_id: system_id.to_string(),
                        report: report.clone(),
                        round,
                    });
                    written += 1;
                }
            }
        }
        written
    }
}

/// 呈現用的單一館結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryHolding {
    pub system_id: String,
    pub system_name: String,
    pub library_name: String,
    pub status: HoldingStatus,
    /// 該系統的預約頁面
    pub reserve_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClassifiedResult {
    pub available_now: Vec<LibraryHolding>,
    pub limited_availability: Vec<LibraryHolding>,
    pub unrecognized: Vec<LibraryHolding>,
    pub found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollTermination {
    Done { polls: u32 },
    Exhausted { polls: u32 },
}

impl PollTermination {
    pub fn polls(&self) -> u32 {
        match self {
            PollTermination::Done { polls } | PollTermination::Exhausted { polls } => *polls,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IsbnSource {
    Corrected,
    Catalog,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LookupOutcome {
    NoLibrariesInRegion,
    Checked {
        termination: PollTermination,
        systems_queried: usize,
        result: ClassifiedResult,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub book: BookIdentity,
    pub isbn: String,
    pub isbn_source: IsbnSource,
    pub region: Region,
    pub outcome: LookupOutcome,
    pub checked_at: DateTime<Utc>,
}

impl AvailabilityReport {
    pub fn found(&self) -> bool {
        match &self.outcome {
            LookupOutcome::NoLibrariesInRegion => false,
            LookupOutcome::Checked { result, .. } => result.found,
        }
    }
}
