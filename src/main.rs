use clap::Parser;
use ehon_finder::app::render;
use ehon_finder::core::catalog::{CHARACTER_KEYWORDS, FEELING_KEYWORDS};
use ehon_finder::core::locator::search_page_url;
use ehon_finder::core::poller::AvailabilityPoller;
use ehon_finder::domain::model::BookIdentity;
use ehon_finder::domain::region::PREFECTURES;
use ehon_finder::utils::error::ErrorSeverity;
use ehon_finder::utils::{logger, validation::Validate};
use ehon_finder::{
    AppConfig, BookDescriber, CalilClient, Catalog, Cli, Command, EhonError, IsbnResolver,
    LibraryLocator, LookupSession, PerplexityClient, Region, RegionDirectory, Result,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// 由配置組裝外部服務與各流程
struct App {
    config: AppConfig,
    locator: LibraryLocator,
    describer: BookDescriber,
}

impl App {
    fn build(config: AppConfig) -> Result<Self> {
        let generator = Arc::new(PerplexityClient::new(&config.text_generation)?);
        let calil = Arc::new(CalilClient::new(&config.library)?);
        let retry = config.retry.policy();

        let resolver = IsbnResolver::new(generator.clone(), retry, config.text_generation.isbn_temperature);
        let directory = RegionDirectory::new(calil.clone(), retry);
        let poller = AvailabilityPoller::new(calil, retry, config.polling.policy());
        let describer = BookDescriber::new(generator, retry, config.text_generation.summary_temperature);

        Ok(Self {
            locator: LibraryLocator::new(resolver, directory, poller),
            describer,
            config,
        })
    }

    async fn search(&self, session: &mut LookupSession, region: &Region, guide: bool) -> Result<()> {
        let report = self.locator.locate(session, region).await?;
        println!("{}", render::availability_report(&report));

        if guide {
            if let Some(text) = self.describer.region_library_guide(&report.book, region).await {
                println!("{}の主な図書館\n{}\n", region, text);
            }
        }

        let url = search_page_url(&self.config.library.site_url, &report.isbn, region)?;
        println!("より詳しい検索結果はカーリルのサイトで確認できます: {}", url);
        println!("{}", render::LIBRARY_CARD_NOTICE);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting ehon-finder");

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 2,      // 輸入錯誤
            ErrorSeverity::Medium => 3,   // 外部服務暫時失敗
            ErrorSeverity::High => 1,     // 資料或處理錯誤
            ErrorSeverity::Critical => 4, // 配置錯誤
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Regions = cli.command {
        println!("{}", render::regions(&PREFECTURES));
        return Ok(());
    }

    let config = AppConfig::load(Some(&cli.config))?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let catalog = Catalog::from_path(&config.catalog.path)?;

    match cli.command {
        Command::Regions => Ok(()),
        Command::Recommend {
            character,
            feeling,
            describe,
        } => {
            let books = catalog.recommend(
                &character,
                &feeling,
                config.catalog.candidate_pool,
                config.catalog.recommendations,
                &mut rand::thread_rng(),
            )?;

            let mut entries = Vec::with_capacity(books.len());
            if describe && !books.is_empty() {
                let app = App::build(config)?;
                let mut session = LookupSession::new();
                for book in books {
                    let summary = app.describer.summary(&mut session, &book.identity()).await;
                    entries.push((book, Some(summary)));
                }
            } else {
                entries.extend(books.into_iter().map(|book| (book, None)));
            }

            print!("{}", render::recommendations(&character, &feeling, &entries));
            Ok(())
        }
        Command::Locate {
            region,
            isbn,
            title,
            author,
            guide,
            json,
        } => {
            let region = Region::parse(&region)?;
            let book = match (title, author) {
                (Some(title), Some(author)) => BookIdentity::new(title, author, isbn),
                _ => catalog
                    .find_by_isbn(&isbn)
                    .map(|book| book.identity())
                    .ok_or(EhonError::BookNotInCatalog { isbn })?,
            };

            let app = App::build(config)?;
            let mut session = LookupSession::new();
            session.select_book(book);

            if json {
                let report = app.locator.locate(&mut session, &region).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            } else {
                app.search(&mut session, &region, guide).await
            }
        }
        Command::Interactive => {
            let app = App::build(config)?;
            interactive(&app, &catalog).await
        }
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<Option<String>> {
    println!("{}", message);
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// 番号でも文字でも選べる
fn pick<'a>(input: &str, options: &[&'a str]) -> Option<&'a str> {
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1]),
        _ => options.iter().copied().find(|option| *option == input),
    }
}

fn numbered(options: &[&str]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}. {}", i + 1, option))
        .collect::<Vec<_>>()
        .join("  ")
}

async fn interactive(app: &App, catalog: &Catalog) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = LookupSession::new();

    println!("📚 楽しい絵本を見つけよう！（q で終了）");

    loop {
        session.start_new_search();

        let Some(input) = prompt(&mut lines, &format!("どんなお話が気になるかな？\n{}", numbered(&CHARACTER_KEYWORDS))).await? else {
            return Ok(());
        };
        if input == "q" {
            return Ok(());
        }
        let Some(character) = pick(&input, &CHARACTER_KEYWORDS) else {
            println!("番号かキーワードで選んでね。");
            continue;
        };

        let Some(input) = prompt(&mut lines, &format!("どんな気持ちになりたい？\n{}", numbered(&FEELING_KEYWORDS))).await? else {
            return Ok(());
        };
        let Some(feeling) = pick(&input, &FEELING_KEYWORDS) else {
            println!("番号かキーワードで選んでね。");
            continue;
        };

        let books = match catalog.recommend(
            character,
            feeling,
            app.config.catalog.candidate_pool,
            app.config.catalog.recommendations,
            &mut rand::thread_rng(),
        ) {
            Ok(books) => books,
            Err(EhonError::UnknownKeyword { keyword }) => {
                tracing::warn!("⚠️ Keyword column '{}' is missing from the catalog", keyword);
                println!("選んだキーワードがデータにないみたい。別のキーワードで試してみてね！");
                continue;
            }
            Err(e) => return Err(e),
        };

        let entries: Vec<_> = books.iter().cloned().map(|book| (book, None)).collect();
        print!("{}", render::recommendations(character, feeling, &entries));
        if books.is_empty() {
            continue;
        }

        let Some(input) = prompt(&mut lines, "図書館で探したい絵本の番号を入力してね（空欄でもどる）").await? else {
            return Ok(());
        };
        let Some(book) = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| books.get(i))
        else {
            continue;
        };

        let identity = book.identity();
        session.select_book(identity.clone());
        let summary = app.describer.summary(&mut session, &identity).await;
        print!("{}", render::book_card(book, Some(summary.as_str())));

        // 同じ本のまま地区を変えて何度でも検索できる
        loop {
            let Some(input) = prompt(&mut lines, "この本が近くの図書館にあるか調べてみよう！都道府県を入力してね（空欄で新しい検索）").await? else {
                return Ok(());
            };
            if input.is_empty() {
                break;
            }
            if input == "q" {
                return Ok(());
            }

            let region = match Region::parse(&input) {
                Ok(region) => region,
                Err(e) => {
                    println!("{}", e.user_friendly_message());
                    continue;
                }
            };

            if let Err(e) = app.search(&mut session, &region, true).await {
                tracing::error!("❌ Library search failed: {}", e);
                println!("{}", e.user_friendly_message());
            }
        }
    }
}
