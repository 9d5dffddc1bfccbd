use crate::config::LibraryApiConfig;
use crate::domain::model::{
    CheckResponse, HoldingStatus, LibraryStatus, LibrarySystem, SystemCheckStatus, SystemReport,
};
use crate::domain::ordered::OrderedMap;
use crate::domain::ports::{AvailabilityService, LibraryDirectoryService};
use crate::domain::region::Region;
use crate::utils::error::{EhonError, Result};
use crate::utils::validation::validate_secret;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "calil";

#[derive(Debug, Deserialize)]
struct CalilLibrary {
    systemid: String,
    #[serde(default)]
    systemname: String,
}

#[derive(Debug, Deserialize)]
struct CalilCheck {
    #[serde(default)]
    session: String,
    #[serde(rename = "continue", default)]
    continue_flag: serde_json::Value,
    #[serde(default)]
    books: OrderedMap<OrderedMap<CalilSystemEntry>>,
}

#[derive(Debug, Deserialize)]
struct CalilSystemEntry {
    #[serde(default)]
    status: String,
    #[serde(default)]
    reserveurl: Option<String>,
    #[serde(default)]
    libkey: OrderedMap<String>,
}

fn is_continue(flag: &serde_json::Value) -> bool {
    match flag {
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s == "1",
        _ => false,
    }
}

impl From<CalilCheck> for CheckResponse {
    fn from(check: CalilCheck) -> Self {
        let continue_polling = is_continue(&check.continue_flag);
        let books = check
            .books
            .into_iter()
            .map(|(isbn, systems)| {
                let systems = systems
                    .into_iter()
                    .map(|(system_id, entry)| {
                        let report = SystemReport {
                            status: SystemCheckStatus::from_code(&entry.status),
                            reserve_url: entry.reserveurl.filter(|u| !u.is_empty()),
                            holdings: entry
                                .libkey
                                .into_iter()
                                .map(|(library_name, label)| LibraryStatus {
                                    status: HoldingStatus::from_label(&label),
                                    library_name,
                                })
                                .collect(),
                        };
                        (system_id, report)
                    })
                    .collect();
                (isbn, systems)
            })
            .collect();

        CheckResponse {
            session_token: check.session,
            continue_polling,
            books,
        }
    }
}

/// カーリル図書館 API：図書館一覧と蔵書確認
pub struct CalilClient {
    client: Client,
    base_url: String,
    app_key: String,
}

impl CalilClient {
    pub fn new(config: &LibraryApiConfig) -> Result<Self> {
        let app_key = validate_secret("library.api_key", &config.api_key)?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            app_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("Making library API request to: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("appkey", self.app_key.as_str()), ("format", "json"), ("callback", "no")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Library API response status: {}", status);
        if !status.is_success() {
            return Err(EhonError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| EhonError::malformed(SERVICE, e.to_string()))
    }
}

#[async_trait]
impl LibraryDirectoryService for CalilClient {
    async fn libraries_in(&self, region: &Region) -> Result<Vec<LibrarySystem>> {
        let libraries: Vec<CalilLibrary> = self.get_json("library", &[("pref", region.name())]).await?;

        Ok(libraries
            .into_iter()
            .map(|library| LibrarySystem {
                system_name: if library.systemname.is_empty() {
                    library.systemid.clone()
                } else {
                    library.systemname
                },
                system_id: library.systemid,
                region: region.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl AvailabilityService for CalilClient {
    async fn start_check(&self, isbn: &str, system_ids: &[String]) -> Result<CheckResponse> {
        let joined = system_ids.join(",");
        let check: CalilCheck = self
            .get_json("check", &[("isbn", isbn), ("systemid", joined.as_str())])
            .await?;
        Ok(check.into())
    }

    async fn poll(&self, session_token: &str) -> Result<CheckResponse> {
        let check: CalilCheck = self.get_json("check", &[("session", session_token)]).await?;
        Ok(check.into())
    }
}
