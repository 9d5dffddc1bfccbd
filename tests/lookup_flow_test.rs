use ehon_finder::config::{LibraryApiConfig, TextGenerationConfig};
use ehon_finder::core::poller::PollingPolicy;
use ehon_finder::domain::model::{BookIdentity, HoldingStatus, IsbnSource, LookupOutcome, PollTermination};
use ehon_finder::{
    AvailabilityPoller, CalilClient, IsbnResolver, LibraryLocator, LookupSession, PerplexityClient, Region,
    RegionDirectory, RetryPolicy,
};
use httpmock::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const CATALOG_ISBN: &str = "9784834000825";
const CORRECTED_ISBN: &str = "9784834032147";

fn locator(server: &MockServer, max_polls: u32) -> LibraryLocator {
    let generator = Arc::new(
        PerplexityClient::new(&TextGenerationConfig {
            endpoint: server.url("/chat/completions"),
            api_key: "pplx-test".to_string(),
            ..TextGenerationConfig::default()
        })
        .unwrap(),
    );
    let calil = Arc::new(
        CalilClient::new(&LibraryApiConfig {
            endpoint: server.base_url(),
            api_key: "test-app-key".to_string(),
            ..LibraryApiConfig::default()
        })
        .unwrap(),
    );
    let retry = RetryPolicy::new(2, Duration::ZERO);
    let polling = PollingPolicy {
        max_polls,
        interval: Duration::ZERO,
    };

    LibraryLocator::new(
        IsbnResolver::new(generator, retry, 0.3),
        RegionDirectory::new(calil.clone(), retry),
        AvailabilityPoller::new(calil, retry, polling),
    )
}

fn session() -> LookupSession {
    let mut session = LookupSession::new();
    session.select_book(BookIdentity::new("ぐりとぐら", "なかがわりえこ", CATALOG_ISBN));
    session
}

fn mock_generator<'a>(server: &'a MockServer, answer: &str) -> httpmock::Mock<'a> {
    let answer = answer.to_string();
    server.mock(move |when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(serde_json::json!({
            "choices": [{"message": {"content": answer}}]
        }));
    })
}

fn mock_directory<'a>(server: &'a MockServer, pref: &str, systems: serde_json::Value) -> httpmock::Mock<'a> {
    let pref = pref.to_string();
    server.mock(move |when, then| {
        when.method(GET).path("/library").query_param("pref", pref);
        then.status(200).json_body(systems);
    })
}

#[tokio::test]
async fn test_corrected_isbn_found_after_one_poll() -> anyhow::Result<()> {
    let server = MockServer::start();
    let generator_mock = mock_generator(&server, &format!("ISBN{}を推奨します", CORRECTED_ISBN));
    mock_directory(
        &server,
        "東京都",
        serde_json::json!([
            {"systemid": "Tokyo_X", "systemname": "X区"},
            {"systemid": "Tokyo_Y", "systemname": "Y区"}
        ]),
    );
    let check_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/check")
            .query_param("isbn", CORRECTED_ISBN)
            .query_param("systemid", "Tokyo_X,Tokyo_Y");
        then.status(200).json_body(serde_json::json!({
            "session": "s1",
            "continue": 1,
            "books": {CORRECTED_ISBN: {"Tokyo_X": {"status": "OK", "libkey": {"中央": "貸出可"}}}}
        }));
    });
    let poll_mock = server.mock(|when, then| {
        when.method(GET).path("/check").query_param("session", "s1");
        then.status(200).json_body(serde_json::json!({
            "session": "s1",
            "continue": 0,
            "books": {CORRECTED_ISBN: {"Tokyo_Y": {"status": "OK", "libkey": {"本館": "蔵書なし"}}}}
        }));
    });

    let mut session = session();
    let report = locator(&server, 10).locate(&mut session, &Region::parse("東京")?).await?;

    generator_mock.assert();
    check_mock.assert();
    poll_mock.assert_hits(1);
    assert_eq!(report.isbn, CORRECTED_ISBN);
    assert_eq!(report.isbn_source, IsbnSource::Corrected);
    match &report.outcome {
        LookupOutcome::Checked {
            termination,
            systems_queried,
            result,
        } => {
            assert_eq!(*termination, PollTermination::Done { polls: 1 });
            assert_eq!(*systems_queried, 2);
            assert_eq!(result.available_now.len(), 1);
            assert_eq!(result.available_now[0].system_name, "X区");
            assert_eq!(result.available_now[0].status, HoldingStatus::Loanable);
            assert!(result.limited_availability.is_empty());
            assert!(result.found);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.last_report(), Some(&report));
    Ok(())
}

#[tokio::test]
async fn test_falls_back_to_catalog_isbn_and_reuses_correction() -> anyhow::Result<()> {
    let server = MockServer::start();
    let generator_mock = mock_generator(&server, "申し訳ありませんが、該当する書籍が見つかりません。");
    mock_directory(&server, "大阪府", serde_json::json!([{"systemid": "Osaka_Osaka", "systemname": "大阪市"}]));
    mock_directory(&server, "京都府", serde_json::json!([{"systemid": "Kyoto_Kyoto", "systemname": "京都市"}]));
    let check_mock = server.mock(|when, then| {
        when.method(GET).path("/check").query_param("isbn", CATALOG_ISBN);
        then.status(200).json_body(serde_json::json!({
            "session": "s2",
            "continue": 0,
            "books": {CATALOG_ISBN: {
                "Osaka_Osaka": {"status": "OK", "libkey": {"中央": "貸出中"}},
                "Kyoto_Kyoto": {"status": "OK", "libkey": {}}
            }}
        }));
    });

    let locator = locator(&server, 10);
    let mut session = session();

    let osaka = locator.locate(&mut session, &Region::parse("大阪")?).await?;
    let kyoto = locator.locate(&mut session, &Region::parse("京都府")?).await?;

    // 兩次重試後放棄校正，第二個地區不再詢問
    generator_mock.assert_hits(2);
    check_mock.assert_hits(2);
    assert_eq!(osaka.isbn, CATALOG_ISBN);
    assert_eq!(osaka.isbn_source, IsbnSource::Catalog);
    assert!(osaka.found());
    assert_eq!(kyoto.isbn, CATALOG_ISBN);
    assert!(!kyoto.found());
    Ok(())
}

#[tokio::test]
async fn test_empty_region_never_checks_availability() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_generator(&server, CORRECTED_ISBN);
    mock_directory(&server, "沖縄県", serde_json::json!([]));
    let check_mock = server.mock(|when, then| {
        when.method(GET).path("/check");
        then.status(200).json_body(serde_json::json!({"session": "", "continue": 0, "books": {}}));
    });

    let mut session = session();
    let report = locator(&server, 10).locate(&mut session, &Region::parse("沖縄")?).await?;

    check_mock.assert_hits(0);
    assert_eq!(report.outcome, LookupOutcome::NoLibrariesInRegion);
    assert!(!report.found());
    Ok(())
}

#[tokio::test]
async fn test_exhausted_polling_keeps_partial_results() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_generator(&server, CORRECTED_ISBN);
    mock_directory(
        &server,
        "北海道",
        serde_json::json!([
            {"systemid": "Hokkaido_Sapporo", "systemname": "札幌市"},
            {"systemid": "Hokkaido_Asahikawa", "systemname": "旭川市"}
        ]),
    );
    server.mock(|when, then| {
        when.method(GET).path("/check").query_param("isbn", CORRECTED_ISBN);
        then.status(200).json_body(serde_json::json!({
            "session": "slow",
            "continue": 1,
            "books": {CORRECTED_ISBN: {
                "Hokkaido_Sapporo": {"status": "OK", "libkey": {"中央": "館内のみ"}},
                "Hokkaido_Asahikawa": {"status": "Running"}
            }}
        }));
    });
    let poll_mock = server.mock(|when, then| {
        when.method(GET).path("/check").query_param("session", "slow");
        then.status(200).json_body(serde_json::json!({
            "session": "slow",
            "continue": 1,
            "books": {CORRECTED_ISBN: {"Hokkaido_Asahikawa": {"status": "Running"}}}
        }));
    });

    let mut session = session();
    let report = locator(&server, 3).locate(&mut session, &Region::parse("北海道")?).await?;

    poll_mock.assert_hits(3);
    match report.outcome {
        LookupOutcome::Checked { termination, result, .. } => {
            assert_eq!(termination, PollTermination::Exhausted { polls: 3 });
            assert_eq!(result.limited_availability.len(), 1);
            assert_eq!(result.limited_availability[0].status, HoldingStatus::LibraryUseOnly);
            assert!(result.found);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_directory_failure_surfaces_as_error() {
    let server = MockServer::start();
    mock_generator(&server, CORRECTED_ISBN);
    let directory_mock = server.mock(|when, then| {
        when.method(GET).path("/library");
        then.status(502);
    });

    let mut session = session();
    let result = locator(&server, 10).locate(&mut session, &Region::parse("福岡").unwrap()).await;

    directory_mock.assert_hits(2);
    let err = result.unwrap_err();
    assert_eq!(err.user_friendly_message(), "検索を完了できませんでした。");
    assert!(session.last_report().is_none());
}
