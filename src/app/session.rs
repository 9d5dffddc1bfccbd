use crate::domain::model::{AvailabilityReport, BookIdentity};
use std::collections::HashMap;

/// ISBN 校正的快取狀態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorrectionState {
    #[default]
    Unresolved,
    /// 已詢問過；`None` 表示無法校正，之後直接使用目錄的 ISBN
    Resolved(Option<String>),
}

/// 一次互動期間的狀態，取代全域的 session dict。
///
/// - `select_book` 會更換選書並清除 ISBN 校正與上次的查詢結果
/// - `start_new_search` 清除選書、校正與結果
/// - 摘要快取以 (書名, 作者) 為鍵，跨選書保留
#[derive(Debug, Default)]
pub struct LookupSession {
    selected: Option<BookIdentity>,
    correction: CorrectionState,
    summaries: HashMap<(String, String), String>,
    last_report: Option<AvailabilityReport>,
}

impl LookupSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_book(&mut self, book: BookIdentity) {
        if self.selected.as_ref() != Some(&book) {
            tracing::debug!("📖 Selected '{}' ({})", book.title, book.catalog_isbn);
        }
        self.selected = Some(book);
        self.correction = CorrectionState::Unresolved;
        self.last_report = None;
    }

    pub fn start_new_search(&mut self) {
        self.selected = None;
        self.correction = CorrectionState::Unresolved;
        self.last_report = None;
    }

    pub fn selected_book(&self) -> Option<&BookIdentity> {
        self.selected.as_ref()
    }

    pub fn correction(&self) -> &CorrectionState {
        &self.correction
    }

    pub fn record_correction(&mut self, isbn: Option<String>) {
        self.correction = CorrectionState::Resolved(isbn);
    }

    pub fn cached_summary(&self, book: &BookIdentity) -> Option<&str> {
        self.summaries.get(&book.cache_key()).map(String::as_str)
    }

    pub fn cache_summary(&mut self, book: &BookIdentity, summary: String) {
        self.summaries.insert(book.cache_key(), summary);
    }

    pub fn record_report(&mut self, report: AvailabilityReport) {
        self.last_report = Some(report);
    }

    pub fn last_report(&self) -> Option<&AvailabilityReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guri() -> BookIdentity {
        BookIdentity::new("ぐりとぐら", "なかがわりえこ", "9784834000825")
    }

    #[test]
    fn test_select_book_resets_correction() {
        let mut session = LookupSession::new();
        session.select_book(guri());
        session.record_correction(Some("9784834000825".to_string()));

        session.select_book(BookIdentity::new("はらぺこあおむし", "エリック・カール", "9784033280103"));
        assert_eq!(session.correction(), &CorrectionState::Unresolved);
        assert_eq!(session.selected_book().unwrap().title, "はらぺこあおむし");
    }

    #[test]
    fn test_new_search_keeps_summaries() {
        let mut session = LookupSession::new();
        let book = guri();
        session.cache_summary(&book, "のねずみのぐりとぐらのおはなし".to_string());
        session.select_book(book.clone());
        session.record_correction(None);

        session.start_new_search();

        assert!(session.selected_book().is_none());
        assert_eq!(session.correction(), &CorrectionState::Unresolved);
        assert_eq!(session.cached_summary(&book), Some("のねずみのぐりとぐらのおはなし"));
    }
}
