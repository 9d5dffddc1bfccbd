use crate::domain::model::{
    AvailabilityReport, CatalogBook, ClassifiedResult, IsbnSource, LibraryHolding, LookupOutcome, PollTermination,
};

pub const NO_SYSTEMS_IN_REGION: &str = "この都道府県には対応図書館がありません。";
pub const NOT_FOUND: &str = "この本を所蔵している図書館は見つかりませんでした。";
pub const NO_MATCHING_BOOKS: &str =
    "ごめんね、選んだキーワードに合う絵本が見つからなかったよ。別のキーワードで試してみよう！";
pub const LIBRARY_CARD_NOTICE: &str = "本を借りるときは、図書館カードが必要です。お近くの図書館に行ってみてね！";

/// 書籍卡片：書名與可選欄位，缺值的欄位不顯示
pub fn book_card(book: &CatalogBook, summary: Option<&str>) -> String {
    let mut out = format!("『{}』\n  著者: {}\n", book.title, book.author);
    if let Some(publisher) = &book.publisher {
        out.push_str(&format!("  出版社: {}\n", publisher));
    }
    if let Some(price) = book.price {
        out.push_str(&format!("  価格: {}円\n", price));
    }
    if let Some(date) = &book.release_date {
        out.push_str(&format!("  発売日: {}\n", date));
    }
    if book.review_score > 0.0 {
        out.push_str(&format!("  レビュー: {}点\n", book.review_score));
    }
    out.push_str(&format!("  ISBN: {}\n", book.isbn));
    if let Some(summary) = summary {
        out.push_str(&format!("  📘 解説: {}\n", summary));
    }
    if let Some(url) = &book.purchase_url {
        out.push_str(&format!("  楽天ブックスで見る: {}\n", url));
    }
    out
}

pub fn recommendations(character: &str, feeling: &str, books: &[(CatalogBook, Option<String>)]) -> String {
    if books.is_empty() {
        return format!("{}\n", NO_MATCHING_BOOKS);
    }

    let mut out = format!("「{}」と「{}」がテーマの絵本が見つかったよ！✨\n\n", character, feeling);
    for (index, (book, summary)) in books.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, book_card(book, summary.as_deref())));
    }
    out
}

fn holding_lines(heading: &str, holdings: &[LibraryHolding]) -> String {
    if holdings.is_empty() {
        return String::new();
    }

    let mut out = format!("{}\n", heading);
    for holding in holdings {
        out.push_str(&format!(
            "  📚 {}（{}）: {}\n",
            holding.library_name,
            holding.system_name,
            holding.status.label()
        ));
    }
    out
}

/// 蔵書のある系統の予約ページ（系統ごとに一度だけ）
fn reservation_links(result: &ClassifiedResult) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut out = String::new();
    for holding in result.available_now.iter().chain(&result.limited_availability) {
        let Some(url) = holding.reserve_url.as_deref() else {
            continue;
        };
        if seen.contains(&holding.system_id.as_str()) {
            continue;
        }
        seen.push(&holding.system_id);
        out.push_str(&format!("  🔖 {}: {}\n", holding.system_name, url));
    }

    if out.is_empty() {
        out
    } else {
        format!("予約はこちらから：\n{}", out)
    }
}

/// 蔵書検索結果の文字列表示
pub fn availability_report(report: &AvailabilityReport) -> String {
    let isbn_note = match report.isbn_source {
        IsbnSource::Corrected => "",
        IsbnSource::Catalog => "（カタログのISBN）",
    };
    let mut out = format!(
        "蔵書検索結果: 『{}』 / {}\nISBN: {}{}\n",
        report.book.title, report.region, report.isbn, isbn_note
    );

    match &report.outcome {
        LookupOutcome::NoLibrariesInRegion => {
            out.push_str(&format!("{}\n", NO_SYSTEMS_IN_REGION));
        }
        LookupOutcome::Checked {
            termination,
            systems_queried,
            result,
        } => {
            out.push_str(&format!(
                "{}の図書館システム {} 件を確認しました。\n",
                report.region, systems_queried
            ));
            if let PollTermination::Exhausted { polls } = termination {
                out.push_str(&format!(
                    "⚠️ {}回確認しましたが、一部の図書館は応答を返しませんでした。\n",
                    polls
                ));
            }

            out.push_str(&holding_lines("貸出可能な図書館が見つかりました！", &result.available_now));
            out.push_str(&holding_lines(
                "以下の図書館でも蔵書がありますが、現在貸出中などの状態です：",
                &result.limited_availability,
            ));
            out.push_str(&holding_lines("状態を判別できなかった図書館：", &result.unrecognized));
            out.push_str(&reservation_links(result));
            if !result.found {
                out.push_str(&format!("{}\n", NOT_FOUND));
            }
        }
    }
    out
}

pub fn regions(names: &[&str]) -> String {
    names
        .chunks(8)
        .map(|row| row.join("  "))
        .collect::<Vec<_>>()
        .join("\n")
}
