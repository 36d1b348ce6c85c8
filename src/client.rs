//! COROS Training Center API client
//!
//! Session handling and every API operation the CLIs use:
//! 1. Password login (`/account/login`, md5-digested password) or direct
//!    token reuse - the single-session workaround where the browser's
//!    `CPL-coros-token` cookie value is passed in as-is
//! 2. Envelope unwrapping - every response is `{result, message, data}`
//!    and anything but result "0000" is a server-side error
//! 3. Exponential backoff with jitter for transient failures
//! 4. Activity listing, export download, FIT import, delete, update
//!
//! The token travels in the `accessToken` request header, never in logs.

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{multipart, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::{CorosConfig, Credentials};
use crate::models::errors::{AppError, CorosResult, ErrorCode};
use crate::models::types::{
    Activity, ActivityDetail, ActivityPage, ApiEnvelope, DownloadData, FileType, LoginData,
    SportType,
};
use crate::telemetry::TransferStats;
use crate::utils::constants::{
    ACCESS_TOKEN_HEADER, ACCOUNT_TYPE_EMAIL, BASE_RETRY_MS, MAX_RETRY_MS, RESULT_OK,
    RETRY_JITTER_PERCENT, UPLOAD_MATCH_TOLERANCE_SECS, USER_AGENT as USER_AGENT_CONST,
};
use crate::utils::fit;

/// Authenticated COROS Training Center session
#[derive(Clone)]
pub struct CorosClient {
    client: reqwest::Client,
    config: CorosConfig,
    access_token: String,
    stats: TransferStats,
}

impl CorosClient {
    /// Build an HTTP client and authenticate.
    ///
    /// With `Credentials::Token` no login request is issued at all; that
    /// is the point of the workaround, since any login invalidates the
    /// session the token came from.
    pub async fn connect(config: CorosConfig, credentials: Credentials) -> CorosResult<Self> {
        let client = Self::build_http_client(&config)?;
        let stats = TransferStats::new();

        let mut session = Self {
            client,
            config,
            access_token: String::new(),
            stats,
        };

        match credentials {
            Credentials::Token { access_token } => {
                info!("🔑 Reusing existing session token (not logging in)");
                session.access_token = access_token;
            }
            Credentials::Password { username, password } => {
                session.access_token = session.login(&username, &password).await?;
                info!("🔑 Logged in as {}", username);
            }
        }

        Ok(session)
    }

    /// Transfer statistics for this session
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Resolved configuration
    pub fn config(&self) -> &CorosConfig {
        &self.config
    }

    /// The session token in use. Callers may persist it for later
    /// `Credentials::Token` runs.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    fn build_http_client(config: &CorosConfig) -> CorosResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .gzip(true)
            .build()
            .map_err(|e| AppError::with_source(ErrorCode::Unknown, "failed to build HTTP client", e))
    }

    // ============================================
    // AUTH
    // ============================================

    /// `POST /account/login`. The password is never sent in the clear;
    /// the API takes its md5 hex digest.
    async fn login(&self, username: &str, password: &str) -> CorosResult<String> {
        let payload = serde_json::json!({
            "account": username,
            "pwd": md5_hex(password),
            "accountType": ACCOUNT_TYPE_EMAIL,
        });

        let builder = self
            .request(Method::POST, "/account/login")
            .json(&payload);
        let resp = self.execute_with_retry(builder).await?;
        let env: ApiEnvelope<LoginData> = self.unwrap_envelope(resp).await.map_err(|e| {
            if e.code == ErrorCode::ApiResult {
                AppError::login_failed(e.message)
            } else {
                e
            }
        })?;

        Ok(Self::require_data(env)?.access_token)
    }

    // ============================================
    // ACTIVITIES
    // ============================================

    /// Page through `GET /activity/query` and return every activity on
    /// the account, newest first (server order).
    pub async fn list_activities(&self) -> CorosResult<Vec<Activity>> {
        let size = self.config.batch_size.max(1);
        let mut activities = Vec::new();
        let mut total: Option<u64> = None;

        for page in 1u32.. {
            debug!(
                "fetching page {} of activities ({} through {})",
                page,
                (page - 1) * size,
                page * size - 1
            );
            let body = self.fetch_page(page, size).await?;

            match total {
                None => total = Some(body.count),
                Some(t) if t != body.count => return Err(AppError::list_changed(t, body.count)),
                _ => {}
            }

            let fetched = body.data_list.len();
            activities.extend(body.data_list);

            let end_index = page as u64 * size as u64;
            if end_index >= total.unwrap_or(0) {
                break;
            }
            if fetched == 0 {
                // Server stopped short of its own count; don't spin
                warn!(
                    "⚠️ Server reported {} activities but stopped sending after {}",
                    total.unwrap_or(0),
                    activities.len()
                );
                break;
            }
        }

        info!("📋 Listed {} activities", activities.len());
        Ok(activities)
    }

    /// Most recent activity, if the account has any
    pub async fn latest_activity(&self) -> CorosResult<Option<Activity>> {
        let body = self.fetch_page(1, 1).await?;
        Ok(body.data_list.into_iter().next())
    }

    async fn fetch_page(&self, page: u32, size: u32) -> CorosResult<ActivityPage> {
        let builder = self.request(Method::GET, "/activity/query").query(&[
            ("size", size.to_string()),
            ("pageNumber", page.to_string()),
        ]);
        let resp = self.execute_with_retry(builder).await?;
        let env = self.unwrap_envelope(resp).await?;
        Self::require_data(env)
    }

    /// Detail record for one activity (`POST /activity/detail/query`,
    /// form-encoded - this endpoint does not take JSON).
    pub async fn activity_detail(
        &self,
        label_id: &str,
        sport_type: SportType,
    ) -> CorosResult<ActivityDetail> {
        let builder = self.request(Method::POST, "/activity/detail/query").form(&[
            ("labelId", label_id.to_string()),
            ("sportType", sport_type.code().to_string()),
        ]);
        let resp = self.execute_with_retry(builder).await?;
        let env = self.unwrap_envelope(resp).await?;
        Self::require_data(env)
    }

    /// Ask the server to export an activity and return the file URL,
    /// `None` when the format is unavailable for this activity.
    pub async fn get_download_url(
        &self,
        label_id: &str,
        sport_type: SportType,
        file_type: FileType,
    ) -> CorosResult<Option<String>> {
        let builder = self.request(Method::GET, "/activity/detail/download").query(&[
            ("labelId", label_id.to_string()),
            ("sportType", sport_type.code().to_string()),
            ("fileType", file_type.code().to_string()),
        ]);
        let resp = self.execute_with_retry(builder).await?;
        let env: ApiEnvelope<DownloadData> = self.unwrap_envelope(resp).await?;
        Ok(Self::require_data(env)?.file_url)
    }

    /// Download an activity export. Resolves the export URL first, then
    /// fetches the raw bytes (the file URL is outside the envelope API).
    pub async fn download_activity(
        &self,
        label_id: &str,
        sport_type: SportType,
        file_type: FileType,
    ) -> CorosResult<Vec<u8>> {
        let url = self
            .get_download_url(label_id, sport_type, file_type)
            .await?
            .ok_or_else(|| AppError::no_export_url(label_id))?;

        debug!("⬇️ fetching export from {}", url);
        let builder = self.request_url(Method::GET, &url);
        let resp = self.execute_with_retry(builder).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::http_status(status.as_u16(), url));
        }

        let bytes = resp.bytes().await.map_err(AppError::from)?;
        self.stats.record_download(bytes.len() as u64);
        Ok(bytes.to_vec())
    }

    /// Upload a FIT file (`POST /activity/fit/import`).
    ///
    /// The import response carries no reference to the created activity,
    /// so the new label ID is recovered by decoding the session start
    /// time out of the local file and matching it against a fresh
    /// listing. Returns `None` when that recovery fails; the upload
    /// itself still happened.
    pub async fn upload_activity(&self, path: &Path, compress: bool) -> CorosResult<Option<String>> {
        let raw = tokio::fs::read(path).await?;
        let mut file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("activity.fit")
            .to_string();

        let body = if compress {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&raw)?;
            file_name.push_str(".gz");
            encoder.finish()?
        } else {
            raw.clone()
        };
        let body_len = body.len() as u64;

        // The web client sends {"source": ..., "timezone": ...} here but
        // the server accepts an empty object.
        let file_part = multipart::Part::bytes(body)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| AppError::with_source(ErrorCode::Unknown, "invalid mime type", e))?;
        let form = multipart::Form::new()
            .part("jsonParameter", multipart::Part::text("{}"))
            .part("sportData", file_part);

        let builder = self
            .request(Method::POST, "/activity/fit/import")
            .multipart(form);
        let resp = self.execute_with_retry(builder).await?;
        let _: ApiEnvelope<serde_json::Value> = self.unwrap_envelope(resp).await?;

        self.stats.record_upload(body_len);
        info!("⬆️ Uploaded {} ({} bytes)", file_name, body_len);

        self.find_uploaded_label(&raw).await
    }

    /// Match an uploaded FIT file's session start time against the
    /// activity listing to recover its label ID.
    async fn find_uploaded_label(&self, raw: &[u8]) -> CorosResult<Option<String>> {
        let start = match fit::session_start_time(raw) {
            Ok(Some(ts)) => ts,
            Ok(None) => {
                warn!("⚠️ FIT file has no session start time; cannot determine activity ID");
                return Ok(None);
            }
            Err(e) => {
                warn!("⚠️ Could not decode FIT file ({}); cannot determine activity ID", e);
                return Ok(None);
            }
        };

        let target = start.timestamp();
        let activities = self.list_activities().await?;
        let found = activities
            .into_iter()
            .find(|a| (a.start_time - target).abs() <= UPLOAD_MATCH_TOLERANCE_SECS);

        if found.is_none() {
            warn!(
                "⚠️ Uploaded FIT file with start time {}, but no matching activity in the listing",
                start
            );
        }
        Ok(found.map(|a| a.label_id))
    }

    /// `GET /activity/delete`
    pub async fn delete_activity(&self, label_id: &str) -> CorosResult<()> {
        let builder = self
            .request(Method::GET, "/activity/delete")
            .query(&[("labelId", label_id)]);
        let resp = self.execute_with_retry(builder).await?;
        let _: ApiEnvelope<serde_json::Value> = self.unwrap_envelope(resp).await?;
        info!("🗑️ Deleted activity {}", label_id);
        Ok(())
    }

    /// `POST /activity/update` - patch activity attributes (e.g. rename:
    /// `{"name": "Evening Run"}`). `attrs` must be a JSON object.
    pub async fn update_activity(
        &self,
        label_id: &str,
        attrs: serde_json::Value,
    ) -> CorosResult<()> {
        let mut payload = match attrs {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(AppError::new(
                    ErrorCode::ConfigInvalidValue,
                    format!("activity attributes must be a JSON object, got {}", other),
                ))
            }
        };
        payload.insert("labelId".to_string(), serde_json::Value::String(label_id.to_string()));

        let builder = self
            .request(Method::POST, "/activity/update")
            .json(&serde_json::Value::Object(payload));
        let resp = self.execute_with_retry(builder).await?;
        let _: ApiEnvelope<serde_json::Value> = self.unwrap_envelope(resp).await?;
        Ok(())
    }

    // ============================================
    // TRANSPORT
    // ============================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base, path);
        self.request_url(method, &url)
    }

    fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if !self.access_token.is_empty() {
            builder = builder.header(ACCESS_TOKEN_HEADER, &self.access_token);
        }
        builder
    }

    /// Send a request, retrying transient failures (timeout, connection
    /// errors, HTTP 429/5xx) with capped exponential backoff plus ±20%
    /// jitter. Requests whose bodies cannot be replayed (multipart
    /// streams) get a single attempt.
    async fn execute_with_retry(&self, builder: RequestBuilder) -> CorosResult<reqwest::Response> {
        let Some(first) = builder.try_clone() else {
            self.stats.record_request();
            return builder.send().await.map_err(AppError::from);
        };

        let mut attempt_builder = Some(first);
        let mut last_error: Option<AppError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let base_delay = BASE_RETRY_MS * (1u64 << (attempt - 1));
                let capped_delay = base_delay.min(MAX_RETRY_MS);
                let jitter_range = (capped_delay * RETRY_JITTER_PERCENT / 100) as i64;
                let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
                let final_delay = (capped_delay as i64 + jitter).max(100) as u64;

                debug!(
                    "⏳ retry {}/{} after {}ms",
                    attempt, self.config.max_retries, final_delay
                );
                self.stats.record_retry();
                tokio::time::sleep(Duration::from_millis(final_delay)).await;

                attempt_builder = builder.try_clone();
            }

            let Some(req) = attempt_builder.take() else {
                break;
            };

            self.stats.record_request();
            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.as_u16() == 429 {
                        warn!("⚠️ Rate limited (HTTP 429)");
                        last_error = Some(AppError::rate_limited());
                        continue;
                    }
                    if status.is_server_error() {
                        last_error =
                            Some(AppError::http_status(status.as_u16(), resp.url().clone()));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    let err = AppError::from(e);
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::new(ErrorCode::Unknown, "request failed with no attempts")))
    }

    /// Check the HTTP status, parse the `{result, message, data}`
    /// envelope and turn non-"0000" results into errors.
    async fn unwrap_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> CorosResult<ApiEnvelope<T>> {
        let status = resp.status();
        let url = resp.url().clone();
        if !status.is_success() {
            return Err(AppError::http_status(status.as_u16(), url));
        }

        let env: ApiEnvelope<T> = resp.json().await.map_err(|e| {
            AppError::with_source(
                ErrorCode::ApiMalformedResponse,
                format!("response from {} is not valid JSON", url),
                e,
            )
        })?;

        match env.result.as_deref() {
            Some(RESULT_OK) => Ok(env),
            other => Err(AppError::api_result(
                other.unwrap_or("<missing>"),
                env.message.as_deref().unwrap_or("request failed"),
            )),
        }
    }

    fn require_data<T>(env: ApiEnvelope<T>) -> CorosResult<T> {
        env.data
            .ok_or_else(|| AppError::malformed("envelope is missing its data payload"))
    }
}

/// md5 hex digest, as expected by the login endpoint
fn md5_hex(input: &str) -> String {
    use md5::{Digest, Md5};

    let digest = Md5::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        // Well-known md5 test vectors
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_require_data() {
        let env = ApiEnvelope::<u32> {
            result: Some("0000".to_string()),
            message: None,
            data: Some(7),
        };
        assert_eq!(CorosClient::require_data(env).unwrap(), 7);

        let empty = ApiEnvelope::<u32> {
            result: Some("0000".to_string()),
            message: None,
            data: None,
        };
        let err = CorosClient::require_data(empty).unwrap_err();
        assert_eq!(err.code, ErrorCode::ApiMalformedResponse);
    }
}
