use crate::domain::model::{
    AvailabilitySession, ClassifiedResult, HoldingCategory, LibraryDirectory, LibraryHolding,
};
use std::collections::HashSet;

/// 將各館狀態分成「すぐ借りられる」「蔵書はあるが貸出中など」兩組。
/// 蔵書なし與 Error 不顯示；未知的狀態另列並記錄警告。
pub struct ResultClassifier;

impl ResultClassifier {
    pub fn classify(session: &AvailabilitySession, directory: &LibraryDirectory) -> ClassifiedResult {
        let mut result = ClassifiedResult::default();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for system in session.results() {
            if !system.report.status.is_finished() {
                tracing::debug!(
                    "System {} not finished ({:?}), skipping",
                    system.system_id,
                    system.report.status
                );
                continue;
            }

            let system_name = directory.system_name(&system.system_id);

            for holding in &system.report.holdings {
                if !seen.insert((system.system_id.as_str(), holding.library_name.as_str())) {
                    continue;
                }

                let entry = || LibraryHolding {
                    system_id: system.system_id.clone(),
                    system_name: system_name.to_string(),
                    library_name: holding.library_name.clone(),
                    status: holding.status.clone(),
                    reserve_url: system.report.reserve_url.clone(),
                };

                match holding.status.category() {
                    HoldingCategory::AvailableNow => result.available_now.push(entry()),
                    HoldingCategory::Limited => result.limited_availability.push(entry()),
                    HoldingCategory::Dropped => {}
                    HoldingCategory::Unrecognized => {
                        tracing::warn!(
                            "❓ Unrecognized holding status '{}' at {} ({})",
                            holding.status.label(),
                            holding.library_name,
                            system_name
                        );
                        result.unrecognized.push(entry());
                    }
                }
            }
        }

        result.found = !result.available_now.is_empty() || !result.limited_availability.is_empty();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        CheckResponse, HoldingStatus, LibraryStatus, LibrarySystem, SystemCheckStatus, SystemReport,
    };
    use crate::domain::ordered::OrderedMap;
    use crate::domain::region::Region;

    const ISBN: &str = "9784001115231";

    fn directory() -> LibraryDirectory {
        let region = Region::parse("神奈川県").unwrap();
        LibraryDirectory::from_systems(
            region.clone(),
            vec![
                LibrarySystem { system_id: "X".into(), system_name: "横浜市".into(), region: region.clone() },
                LibrarySystem { system_id: "Y".into(), system_name: "川崎市".into(), region },
            ],
        )
    }

    fn session(systems: Vec<(&str, &str, Vec<(&str, &str)>)>) -> AvailabilitySession {
        let mut per_system = OrderedMap::new();
        for (id, status, holdings) in systems {
            per_system.insert(
                id.to_string(),
                SystemReport {
                    status: SystemCheckStatus::from_code(status),
                    reserve_url: None,
                    holdings: holdings
                        .into_iter()
                        .map(|(name, label)| LibraryStatus {
                            library_name: name.to_string(),
                            status: HoldingStatus::from_label(label),
                        })
                        .collect(),
                },
            );
        }
        let mut books = OrderedMap::new();
        books.insert(ISBN.to_string(), per_system);

        let mut session = AvailabilitySession::new("s".into(), ISBN.into(), vec!["X".into(), "Y".into()]);
        session.merge(
            &CheckResponse {
                session_token: "s".into(),
                continue_polling: false,
                books,
            },
            1,
        );
        session
    }

    #[test]
    fn test_loanable_and_absent() {
        let session = session(vec![
            ("X", "OK", vec![("中央図書館", "貸出可")]),
            ("Y", "OK", vec![("川崎図書館", "蔵書なし")]),
        ]);

        let result = ResultClassifier::classify(&session, &directory());

        assert!(result.found);
        assert_eq!(result.available_now.len(), 1);
        assert_eq!(result.available_now[0].system_name, "横浜市");
        assert_eq!(result.available_now[0].library_name, "中央図書館");
        assert!(result.limited_availability.is_empty());
    }

    #[test]
    fn test_limited_buckets_and_dropped_statuses() {
        let session = session(vec![(
            "X",
            "OK",
            vec![
                ("中央図書館", "貸出中"),
                ("港北図書館", "館内のみ"),
                ("鶴見図書館", "Error"),
                ("戸塚図書館", "蔵書あり"),
            ],
        )]);

        let result = ResultClassifier::classify(&session, &directory());

        let limited: Vec<&str> = result
            .limited_availability
            .iter()
            .map(|h| h.library_name.as_str())
            .collect();
        assert_eq!(limited, vec!["中央図書館", "港北図書館"]);
        assert_eq!(result.available_now[0].library_name, "戸塚図書館");
        assert!(result.found);
    }

    #[test]
    fn test_unfinished_and_error_systems_are_ignored() {
        let session = session(vec![
            ("X", "Running", vec![("中央図書館", "貸出可")]),
            ("Y", "Error", vec![]),
        ]);

        let result = ResultClassifier::classify(&session, &directory());
        assert!(!result.found);
        assert!(result.available_now.is_empty());
    }

    #[test]
    fn test_unknown_status_is_flagged_not_bucketed() {
        let session = session(vec![("X", "OK", vec![("中央図書館", "取寄中")])]);

        let result = ResultClassifier::classify(&session, &directory());

        assert!(!result.found);
        assert!(result.limited_availability.is_empty());
        assert_eq!(result.unrecognized.len(), 1);
        assert_eq!(
            result.unrecognized[0].status,
            HoldingStatus::Unrecognized("取寄中".to_string())
        );
    }

    #[test]
    fn test_keeps_reported_order_of_systems_and_libraries() {
        let session = session(vec![
            ("Y", "OK", vec![("宮前図書館", "貸出可"), ("麻生図書館", "貸出可")]),
            ("X", "OK", vec![("中央図書館", "貸出可")]),
        ]);

        let result = ResultClassifier::classify(&session, &directory());

        let order: Vec<(&str, &str)> = result
            .available_now
            .iter()
            .map(|h| (h.system_id.as_str(), h.library_name.as_str()))
            .collect();
        assert_eq!(order, vec![("Y", "宮前図書館"), ("Y", "麻生図書館"), ("X", "中央図書館")]);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let session = session(vec![
            ("X", "OK", vec![("中央図書館", "貸出可"), ("港北図書館", "予約中")]),
            ("Y", "Cache", vec![("川崎図書館", "蔵書あり")]),
        ]);
        let directory = directory();

        let first = ResultClassifier::classify(&session, &directory);
        let second = ResultClassifier::classify(&session, &directory);
        assert_eq!(first, second);
        assert_eq!(first.available_now.len(), 2);
    }
}
