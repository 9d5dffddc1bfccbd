use crate::app::session::{CorrectionState, LookupSession};
use crate::core::classifier::ResultClassifier;
use crate::core::directory::RegionDirectory;
use crate::core::isbn::IsbnResolver;
use crate::core::poller::AvailabilityPoller;
use crate::domain::model::{AvailabilityReport, IsbnSource, LookupOutcome};
use crate::domain::region::Region;
use crate::utils::error::{EhonError, Result};
use chrono::Utc;
use url::Url;

/// 串接 ISBN 校正 → 地區圖書館一覽 → 蔵書確認輪詢 → 結果分類
pub struct LibraryLocator {
    resolver: IsbnResolver,
    directory: RegionDirectory,
    poller: AvailabilityPoller,
}

impl LibraryLocator {
    pub fn new(resolver: IsbnResolver, directory: RegionDirectory, poller: AvailabilityPoller) -> Self {
        Self {
            resolver,
            directory,
            poller,
        }
    }

    pub async fn locate(&self, session: &mut LookupSession, region: &Region) -> Result<AvailabilityReport> {
        let book = session.selected_book().cloned().ok_or(EhonError::NoBookSelected)?;

        // 同一本書只校正一次，換地區查詢時沿用
        let corrected = match session.correction() {
            CorrectionState::Resolved(isbn) => isbn.clone(),
            CorrectionState::Unresolved => {
                let isbn = self.resolver.resolve(&book).await;
                session.record_correction(isbn.clone());
                isbn
            }
        };

        let (isbn, isbn_source) = match corrected {
            Some(isbn) => (isbn, IsbnSource::Corrected),
            None => {
                tracing::info!("↩️ Falling back to catalog ISBN {}", book.catalog_isbn);
                (book.catalog_isbn.clone(), IsbnSource::Catalog)
            }
        };

        tracing::info!("🔍 Searching libraries in {} for '{}' (ISBN {})", region, book.title, isbn);

        let directory = self.directory.lookup(region).await?;

        let outcome = if directory.is_empty() {
            LookupOutcome::NoLibrariesInRegion
        } else {
            let polled = self.poller.run(&isbn, &directory.system_ids).await?;
            let result = ResultClassifier::classify(&polled.session, &directory);
            tracing::info!(
                "📚 {} available now, {} limited, found: {}",
                result.available_now.len(),
                result.limited_availability.len(),
                result.found
            );
            LookupOutcome::Checked {
                termination: polled.termination,
                systems_queried: directory.len(),
                result,
            }
        };

        let report = AvailabilityReport {
            book,
            isbn,
            isbn_source,
            region: region.clone(),
            outcome,
            checked_at: Utc::now(),
        };
        session.record_report(report.clone());
        Ok(report)
    }
}

/// 網頁版的蔵書検索連結
pub fn search_page_url(site_url: &str, isbn: &str, region: &Region) -> Result<Url> {
    let mut url = Url::parse(site_url)
        .and_then(|base| base.join(&format!("book/{}/search", isbn)))
        .map_err(|e| EhonError::InvalidConfigValueError {
            field: "library.site_url".to_string(),
            value: site_url.to_string(),
            reason: e.to_string(),
        })?;
    url.query_pairs_mut().append_pair("pref", region.name());
    Ok(url)
}
