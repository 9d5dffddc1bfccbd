use crate::domain::model::CatalogBook;
use crate::utils::error::{EhonError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

/// 角色／主題關鍵字
pub const CHARACTER_KEYWORDS: [&str; 10] = [
    "どうぶつ", "きょうりゅう", "いぬ", "ねこ", "のりもの", "むし", "おばけ", "あんぱんまん", "そら", "まほう",
];

/// 心情關鍵字
pub const FEELING_KEYWORDS: [&str; 11] = [
    "わくわく", "どきどき", "いらいら", "きらきら", "楽しい", "かわいい", "シリーズ", "世界", "もの", "シール", "登場",
];

pub const DEFAULT_CANDIDATE_POOL: usize = 30;
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

const ISBN: &str = "isbn";
const TITLE: &str = "title";
const AUTHOR: &str = "author";
const PUBLISHER: &str = "publisherName";
const PRICE: &str = "itemPrice";
const RELEASE_DATE: &str = "salesDate";
const REVIEW: &str = "reviewAverage";
const IMAGE_URL: &str = "largeImageUrl";
const PURCHASE_URL: &str = "itemUrl";

const DESCRIPTIVE_COLUMNS: [&str; 9] = [
    ISBN, TITLE, AUTHOR, PUBLISHER, PRICE, RELEASE_DATE, REVIEW, IMAGE_URL, PURCHASE_URL,
];

/// CSV 目錄：固定欄位加上多個 0/1 關鍵字欄位
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<CatalogBook>,
    keyword_columns: HashSet<String>,
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "nan")
        .map(str::to_string)
}

fn is_member(value: &str) -> bool {
    matches!(value.trim(), "1" | "1.0" | "True" | "true")
}

impl Catalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let catalog = Self::from_reader(file)?;
        tracing::info!("📒 Loaded {} books from {}", catalog.len(), path.as_ref().display());
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h.trim(), i)).collect();
        for required in [ISBN, TITLE, AUTHOR] {
            if !index.contains_key(required) {
                return Err(EhonError::ConfigValidationError {
                    field: "catalog".to_string(),
                    message: format!("missing column '{}'", required),
                });
            }
        }

        let keyword_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !DESCRIPTIVE_COLUMNS.contains(&h.trim()))
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        let mut books = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let field = |name: &str| index.get(name).and_then(|&i| record.get(i));

            let Some(isbn) = optional(field(ISBN)) else {
                tracing::debug!("Skipping catalog row without ISBN");
                continue;
            };

            books.push(CatalogBook {
                isbn: isbn.strip_suffix(".0").unwrap_or(&isbn).to_string(),
                title: optional(field(TITLE)).unwrap_or_default(),
                author: optional(field(AUTHOR)).unwrap_or_default(),
                publisher: optional(field(PUBLISHER)),
                price: optional(field(PRICE))
                    .and_then(|p| p.parse::<f64>().ok())
                    .map(|p| p as u32),
                release_date: optional(field(RELEASE_DATE)),
                review_score: optional(field(REVIEW))
                    .and_then(|r| r.parse::<f64>().ok())
                    .unwrap_or(0.0),
                image_url: optional(field(IMAGE_URL)),
                purchase_url: optional(field(PURCHASE_URL)),
                keywords: keyword_columns
                    .iter()
                    .filter(|(i, _)| record.get(*i).is_some_and(is_member))
                    .map(|(_, name)| name.clone())
                    .collect(),
            });
        }

        Ok(Self {
            books,
            keyword_columns: keyword_columns.into_iter().map(|(_, name)| name).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn has_keyword_column(&self, keyword: &str) -> bool {
        self.keyword_columns.contains(keyword)
    }

    pub fn find_by_isbn(&self, isbn: &str) -> Option<&CatalogBook> {
        let isbn = isbn.trim();
        self.books.iter().find(|book| book.isbn == isbn)
    }

    /// 同時屬於兩個關鍵字的書；關鍵字欄位不存在時回傳錯誤
    pub fn matching(&self, first: &str, second: &str) -> Result<Vec<&CatalogBook>> {
        for keyword in [first, second] {
            if !self.has_keyword_column(keyword) {
                return Err(EhonError::UnknownKeyword {
                    keyword: keyword.to_string(),
                });
            }
        }

        Ok(self
            .books
            .iter()
            .filter(|book| book.has_keyword(first) && book.has_keyword(second))
            .collect())
    }

    /// 依評分取前 `pool` 本，再從中隨機挑 `count` 本
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        first: &str,
        second: &str,
        pool: usize,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<CatalogBook>> {
        let mut candidates = self.matching(first, second)?;
        candidates.sort_by(|a, b| b.review_score.total_cmp(&a.review_score));
        candidates.truncate(pool);

        tracing::debug!(
            "🎯 {} candidates for '{}' × '{}', picking {}",
            candidates.len(),
            first,
            second,
            count.min(candidates.len())
        );

        Ok(candidates
            .choose_multiple(rng, count)
            .map(|book| (*book).clone())
            .collect())
    }
}
