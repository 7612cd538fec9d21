//! Remote growth-platform API client.
//!
//! Thin typed wrappers over the six endpoints the automation depends on.
//! Every wrapper returns an explicit [`ApiError`] so callers pattern-match
//! on rejection codes instead of inspecting message strings.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use moonbot_game::{ItemCatalog, ItemDefinition, ItemKind, TicketBudget};

pub const DEFAULT_BASE_URL: &str =
    "https://www.binance.com/bapi/growth/v1/friendly/growth-paas";

/// Activity resource all requests address.
pub const RESOURCE_ID: u32 = 2056;

/// Business code for a successful call.
pub const CODE_OK: &str = "000000";
/// Start-game rejection meaning the account has no tickets left.
pub const CODE_OUT_OF_TICKETS: &str = "116002";

const SOCIAL_TYPE: &str = "telegram";
const GROWTH_TOKEN_HEADER: &str = "X-Growth-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ACCESS_TOKEN_PATH: &str = "/third-party/access/accessToken";
const USER_INFO_PATH: &str = "/mini-app-activity/third-party/user/user-info";
const GAME_START_PATH: &str = "/mini-app-activity/third-party/game/start";
const GAME_COMPLETE_PATH: &str = "/mini-app-activity/third-party/game/complete";
const TASK_LIST_PATH: &str = "/mini-app-activity/third-party/task/list";
const TASK_COMPLETE_PATH: &str = "/mini-app-activity/third-party/task/complete";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure or no response at all.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote answered with a non-success business code.
    #[error("remote rejected request (code {code}): {message}")]
    Rejected { code: String, message: String },
    /// The remote answered but the body had an unexpected shape.
    #[error("unexpected response shape: {0}")]
    Data(String),
}

impl ApiError {
    /// True for the distinguished start-game rejection that means the
    /// ticket budget is spent. A normal stop, not a failure.
    #[must_use]
    pub fn is_out_of_tickets(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if code == CODE_OUT_OF_TICKETS)
    }
}

/// Successful start-game response: session key material plus the catalog.
#[derive(Debug, Clone)]
pub struct GameStart {
    pub game_tag: String,
    pub catalog: ItemCatalog,
}

/// Qualified-account summary from user info.
#[derive(Debug, Clone, Copy)]
pub struct UserSummary {
    pub total_grade: i64,
    pub budget: TicketBudget,
}

/// The remote operations the session and cycle layers depend on.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn access_token(&self, query: &str) -> Result<String, ApiError>;
    /// `Ok(None)` means the account is unqualified (no meta info) and
    /// should be skipped without error.
    async fn user_info(&self, token: &str) -> Result<Option<UserSummary>, ApiError>;
    async fn start_game(&self, token: &str) -> Result<GameStart, ApiError>;
    async fn complete_game(
        &self,
        token: &str,
        payload: &str,
        score: i32,
    ) -> Result<(), ApiError>;
    /// Resource ids of tasks not yet completed.
    async fn task_list(&self, token: &str) -> Result<Vec<u64>, ApiError>;
    /// Returns the task type label when the remote reports one.
    async fn complete_task(&self, token: &str, task_id: u64) -> Result<Option<String>, ApiError>;
}

/// Standard response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// Enforce the common `code == "000000" && success` criterion and
    /// unwrap the data field.
    fn require_ok(self) -> Result<T, ApiError> {
        let code = self.code.unwrap_or_default();
        if code != CODE_OK || !self.success {
            return Err(ApiError::Rejected {
                code,
                message: self.message.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| ApiError::Data("missing data field".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfoData {
    meta_info: Option<MetaInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MetaInfo {
    total_grade: i64,
    total_attempts: u32,
    consumed_attempts: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameStartData {
    game_tag: String,
    crypto_miner_config: MinerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MinerConfig {
    item_setting_list: Vec<ItemSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSetting {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: i32,
    #[serde(default)]
    reward_value_list: Vec<i32>,
}

#[derive(Debug, Deserialize)]
struct TaskListData {
    data: Vec<TaskGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskGroup {
    task_list: TaskPage,
}

#[derive(Debug, Deserialize)]
struct TaskPage {
    data: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskEntry {
    resource_id: u64,
    #[serde(default)]
    completed_count: u32,
}

#[derive(Debug, Deserialize)]
struct TaskCompleteData {
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn parse_item_kind(raw: &str) -> Option<ItemKind> {
    match raw {
        "REWARD" => Some(ItemKind::Reward),
        "TRAP" => Some(ItemKind::Trap),
        "BONUS" => Some(ItemKind::Bonus),
        _ => None,
    }
}

fn catalog_from_settings(settings: Vec<ItemSetting>) -> ItemCatalog {
    let items = settings
        .into_iter()
        .filter_map(|setting| {
            let Some(kind) = parse_item_kind(&setting.kind) else {
                debug!("ignoring unknown item kind {:?}", setting.kind);
                return None;
            };
            Some(ItemDefinition {
                kind,
                size: setting.size,
                reward_magnitude: setting.reward_value_list.first().copied().unwrap_or(0),
            })
        })
        .collect();
    ItemCatalog::new(items)
}

/// Browser-mimicking header set carried on every request.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US;q=0.6,en;q=0.5"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://www.binance.com"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://www.binance.com/vi/game/tg/moon-bix"),
    );
    headers.insert(
        "Sec-Ch-Ua",
        HeaderValue::from_static(
            "\"Not/A)Brand\";v=\"99\", \"Google Chrome\";v=\"115\", \"Chromium\";v=\"115\"",
        ),
    );
    headers.insert("Sec-Ch-Ua-Mobile", HeaderValue::from_static("?0"));
    headers.insert("Sec-Ch-Ua-Platform", HeaderValue::from_static("\"Windows\""));
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
        ),
    );
    headers
}

/// Production client against the growth platform.
pub struct GrowthApi {
    http: reqwest::Client,
    base_url: String,
}

impl GrowthApi {
    pub fn new(base_url: &str, proxy: Option<reqwest::Proxy>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(REQUEST_TIMEOUT);
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Result<Envelope<T>, ApiError> {
        let mut request = self.http.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(token) = token {
            request = request.header(GROWTH_TOKEN_HEADER, token);
        }
        let response = request.send().await?;
        response
            .json::<Envelope<T>>()
            .await
            .map_err(|err| ApiError::Data(err.to_string()))
    }
}

#[async_trait]
impl GameApi for GrowthApi {
    async fn access_token(&self, query: &str) -> Result<String, ApiError> {
        let envelope: Envelope<AccessTokenData> = self
            .post(
                ACCESS_TOKEN_PATH,
                None,
                json!({ "queryString": query, "socialType": SOCIAL_TYPE }),
            )
            .await?;
        Ok(envelope.require_ok()?.access_token)
    }

    async fn user_info(&self, token: &str) -> Result<Option<UserSummary>, ApiError> {
        let envelope: Envelope<UserInfoData> = self
            .post(USER_INFO_PATH, Some(token), json!({ "resourceId": RESOURCE_ID }))
            .await?;
        let data = envelope.require_ok()?;
        Ok(data.meta_info.map(|meta| UserSummary {
            total_grade: meta.total_grade,
            budget: TicketBudget::new(meta.total_attempts, meta.consumed_attempts),
        }))
    }

    async fn start_game(&self, token: &str) -> Result<GameStart, ApiError> {
        let envelope: Envelope<GameStartData> = self
            .post(GAME_START_PATH, Some(token), json!({ "resourceId": RESOURCE_ID }))
            .await?;
        // Start only checks the business code; the success flag is unset on
        // some deployments even for accepted starts.
        let code = envelope.code.unwrap_or_default();
        if code != CODE_OK {
            return Err(ApiError::Rejected {
                code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        let data = envelope
            .data
            .ok_or_else(|| ApiError::Data("start response missing data".to_string()))?;
        Ok(GameStart {
            game_tag: data.game_tag,
            catalog: catalog_from_settings(data.crypto_miner_config.item_setting_list),
        })
    }

    async fn complete_game(
        &self,
        token: &str,
        payload: &str,
        score: i32,
    ) -> Result<(), ApiError> {
        let envelope: Envelope<serde_json::Value> = self
            .post(
                GAME_COMPLETE_PATH,
                Some(token),
                json!({ "resourceId": RESOURCE_ID, "payload": payload, "log": score }),
            )
            .await?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                code: envelope.code.unwrap_or_default(),
                message: envelope.message.unwrap_or_default(),
            })
        }
    }

    async fn task_list(&self, token: &str) -> Result<Vec<u64>, ApiError> {
        let envelope: Envelope<TaskListData> = self
            .post(TASK_LIST_PATH, Some(token), json!({ "resourceId": RESOURCE_ID }))
            .await?;
        let groups = envelope.require_ok()?;
        let page = groups
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Data("empty task group list".to_string()))?;
        Ok(page
            .task_list
            .data
            .into_iter()
            .filter(|task| task.completed_count == 0)
            .map(|task| task.resource_id)
            .collect())
    }

    async fn complete_task(&self, token: &str, task_id: u64) -> Result<Option<String>, ApiError> {
        let envelope: Envelope<TaskCompleteData> = self
            .post(
                TASK_COMPLETE_PATH,
                Some(token),
                json!({ "resourceIdList": [task_id], "referralCode": null }),
            )
            .await?;
        Ok(envelope.require_ok()?.kind)
    }
}
