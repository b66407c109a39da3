//! BodyMedia armband adapter.
//!
//! BodyMedia hands out short-lived access tokens through a delegated login
//! exchange: the platform's API key plus the user's stored BodyMedia
//! username and password buy a token scoped to that user. Tokens are cached
//! process-wide (see [`TokenCache`]) so concurrent requests for the same
//! user share one exchange. The sleep feed has no native paging (it returns
//! the bounded set of days inside the requested range), so the uniform
//! window is applied in memory after a reverse-chronological sort.

use serde::Deserialize;
use serde_json::json;
use time::macros::format_description;
use time::{Date, Duration};

use crate::adapters::{ServiceContext, SourceAdapter, SourceError, render_points};
use crate::columns::ColumnNode;
use crate::http_client::{HttpAuth, HttpRequest};
use crate::paging::{PagingWindow, sort_reverse_chronological};
use crate::schema::{DataSchema, SchemaField};
use crate::token_cache::CachedToken;
use crate::{DataPoint, SourceId, UtcDateTime};

const BASE_URL: &str = "https://api.bodymedia.com/v2/";

/// Fallback token lifetime when the login response does not carry one.
const DEFAULT_TOKEN_TTL_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SleepFeed {
    #[serde(default)]
    days: Vec<SleepRecord>,
}

#[derive(Debug, Deserialize)]
struct SleepRecord {
    date: String,
    #[serde(rename = "totalLying")]
    total_lying: f64,
    #[serde(rename = "totalSleep")]
    total_sleep: f64,
    efficiency: f64,
}

/// Adapter for BodyMedia's per-day sleep summaries.
#[derive(Debug, Default)]
pub struct BodyMediaSleep {
    points: Option<Vec<DataPoint>>,
}

impl BodyMediaSleep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the delegated login exchange for `ctx.owner`, returning the
    /// access token. Called through the token cache so a valid cached token
    /// short-circuits the upstream round trip.
    async fn exchange_token(ctx: &ServiceContext<'_>) -> Result<CachedToken, SourceError> {
        let api_key = ctx.credential("api_key")?;
        let username = ctx.credential(&format!("{}_username", ctx.owner))?;
        let password = ctx.credential(&format!("{}_password", ctx.owner))?;

        let request = HttpRequest::post(format!("{BASE_URL}oauth/login")).with_form(&[
            ("api_key", api_key),
            ("username", username),
            ("password", password),
        ]);

        let response = ctx
            .http
            .execute(request)
            .await
            .map_err(|error| SourceError::transport(error.to_string()))?;
        if !response.is_success() {
            return Err(SourceError::upstream(format!(
                "body_media login returned status {}",
                response.status
            )));
        }

        let login: LoginResponse = serde_json::from_str(&response.body).map_err(|error| {
            SourceError::malformed(format!("the login response was not valid JSON: {error}"))
        })?;

        let ttl = login.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Ok(CachedToken::new(
            login.access_token,
            UtcDateTime::now().saturating_add(Duration::seconds(ttl)),
        ))
    }

    fn parse_record_date(value: &str) -> Result<UtcDateTime, SourceError> {
        let format = format_description!("[year]-[month]-[day]");
        let date = Date::parse(value, format).map_err(|_| {
            SourceError::malformed(format!("unparsable sleep record date: '{value}'"))
        })?;
        UtcDateTime::from_offset_datetime(date.midnight().assume_utc())
            .map_err(|error| SourceError::malformed(error.to_string()))
    }
}

impl SourceAdapter for BodyMediaSleep {
    fn source(&self) -> SourceId {
        SourceId::BodyMedia
    }

    fn stream(&self) -> &'static str {
        "sleep"
    }

    fn has_id(&self) -> bool {
        false
    }

    fn has_timestamp(&self) -> bool {
        true
    }

    fn has_location(&self) -> bool {
        false
    }

    fn describe_schema(&self) -> DataSchema {
        DataSchema::object(vec![
            SchemaField::string("date"),
            SchemaField::number("totalLying"),
            SchemaField::number("totalSleep"),
            SchemaField::number("efficiency"),
        ])
    }

    fn service<'a>(
        &'a mut self,
        ctx: &'a ServiceContext<'a>,
        window: PagingWindow,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), SourceError>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.points.is_some() {
                return Ok(());
            }

            let cache_key = format!("body_media:{}", ctx.owner);
            let token = ctx
                .tokens
                .get_or_exchange(&cache_key, || Self::exchange_token(ctx))
                .await?;

            let mut request = HttpRequest::get(format!("{BASE_URL}sleep/days"))
                .with_auth(&HttpAuth::BearerToken(token));
            if let Some(start) = ctx.start_time {
                request = request.with_query("from", &start.format_rfc3339());
            }
            if let Some(end) = ctx.end_time {
                request = request.with_query("to", &end.format_rfc3339());
            }

            let response = ctx
                .http
                .execute(request)
                .await
                .map_err(|error| SourceError::transport(error.to_string()))?;
            if !response.is_success() {
                return Err(SourceError::upstream_status(self.source(), response.status));
            }

            let feed: SleepFeed = serde_json::from_str(&response.body).map_err(|error| {
                SourceError::malformed(format!("the sleep feed was not valid JSON: {error}"))
            })?;

            let mut points = Vec::with_capacity(feed.days.len());
            for record in feed.days {
                let timestamp = Self::parse_record_date(&record.date)?;
                points.push(
                    DataPoint::new(json!({
                        "date": record.date,
                        "totalLying": record.total_lying,
                        "totalSleep": record.total_sleep,
                        "efficiency": record.efficiency,
                    }))
                    .with_timestamp(timestamp),
                );
            }

            sort_reverse_chronological(&mut points, |point| point.timestamp);
            self.points = Some(window.window(points));
            Ok(())
        })
    }

    fn num_data_points(&self) -> Result<usize, SourceError> {
        self.points
            .as_ref()
            .map(Vec::len)
            .ok_or_else(SourceError::not_serviced)
    }

    fn respond(&self, columns: Option<&ColumnNode>) -> Result<Vec<serde_json::Value>, SourceError> {
        let points = self.points.as_ref().ok_or_else(SourceError::not_serviced)?;
        Ok(render_points(self, points, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SourceErrorKind;
    use crate::http_client::ScriptedHttpClient;
    use crate::token_cache::TokenCache;
    use std::collections::BTreeMap;

    fn body_media_credentials() -> BTreeMap<String, String> {
        BTreeMap::from([
            (String::from("api_key"), String::from("bm-app-key")),
            (String::from("alice_username"), String::from("alice@armband")),
            (String::from("alice_password"), String::from("hunter2")),
        ])
    }

    fn login_response() -> String {
        json!({"access_token": "bm-access", "expires_in": 300}).to_string()
    }

    fn sleep_feed() -> String {
        json!({
            "days": [
                {"date": "2024-02-01", "totalLying": 470.0, "totalSleep": 420.0, "efficiency": 89.4},
                {"date": "2024-02-03", "totalLying": 500.0, "totalSleep": 455.0, "efficiency": 91.0},
                {"date": "2024-02-02", "totalLying": 480.0, "totalSleep": 430.0, "efficiency": 89.6},
            ],
        })
        .to_string()
    }

    #[tokio::test]
    async fn exchanges_once_then_sorts_and_windows_in_memory() {
        let client = ScriptedHttpClient::new()
            .respond_ok(login_response())
            .respond_ok(sleep_feed());
        let credentials = body_media_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let window = PagingWindow::new(1, 1).expect("valid window");
        let mut adapter = BodyMediaSleep::new();
        adapter.service(&ctx, window).await.expect("service succeeds");

        // Reverse-chronological candidates: 02-03, 02-02, 02-01. Skip one,
        // return one.
        assert_eq!(adapter.num_data_points().expect("serviced"), 1);
        let points = adapter.respond(None).expect("serviced");
        assert_eq!(points[0]["data"]["date"], json!("2024-02-02"));
        assert!(points[0]["metadata"].get("id").is_none());
        assert_eq!(
            points[0]["metadata"]["timestamp"],
            json!("2024-02-02T00:00:00Z")
        );

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.ends_with("oauth/login"));
        assert!(
            requests[0]
                .body
                .as_deref()
                .is_some_and(|body| body.contains("username=alice%40armband"))
        );
        assert_eq!(
            requests[1].headers.get("authorization").map(String::as_str),
            Some("Bearer bm-access")
        );
    }

    #[tokio::test]
    async fn cached_token_skips_the_login_exchange() {
        let client = ScriptedHttpClient::new()
            .respond_ok(login_response())
            .respond_ok(sleep_feed())
            .respond_ok(sleep_feed());
        let credentials = body_media_credentials();
        let tokens = TokenCache::new();

        for _ in 0..2 {
            let ctx = ServiceContext {
                owner: "alice",
                credentials: &credentials,
                start_time: None,
                end_time: None,
                http: &client,
                tokens: &tokens,
            };
            let mut adapter = BodyMediaSleep::new();
            adapter
                .service(&ctx, PagingWindow::default())
                .await
                .expect("service succeeds");
        }

        // One login, two data fetches.
        let urls: Vec<String> = client
            .recorded_requests()
            .into_iter()
            .map(|request| request.url)
            .collect();
        assert_eq!(
            urls.iter().filter(|url| url.contains("oauth/login")).count(),
            1
        );
        assert_eq!(
            urls.iter().filter(|url| url.contains("sleep/days")).count(),
            2
        );
    }

    #[tokio::test]
    async fn rejected_login_maps_to_an_upstream_failure() {
        let client = ScriptedHttpClient::new().respond_status(401, "bad credentials");
        let credentials = body_media_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let mut adapter = BodyMediaSleep::new();
        let err = adapter
            .service(&ctx, PagingWindow::default())
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::Upstream);
        assert!(adapter.num_data_points().is_err());
    }

    #[tokio::test]
    async fn missing_user_account_credentials_fail_before_any_request() {
        let client = ScriptedHttpClient::new();
        let credentials =
            BTreeMap::from([(String::from("api_key"), String::from("bm-app-key"))]);
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let mut adapter = BodyMediaSleep::new();
        let err = adapter
            .service(&ctx, PagingWindow::default())
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::MissingCredentials);
        assert!(client.recorded_requests().is_empty());
    }
}
