//! RunKeeper (Health Graph) adapters.
//!
//! RunKeeper exposes a per-user bearer token that the platform stores at
//! registration time under `bearer_<username>`. The fitness-activities feed
//! is natively paged by page index + page size; the profile endpoint returns
//! a single record and supports no paging at all.

use serde::Deserialize;
use serde_json::json;
use time::PrimitiveDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::adapters::{
    ServiceContext, SourceAdapter, SourceError, render_points,
};
use crate::columns::ColumnNode;
use crate::http_client::{HttpAuth, HttpRequest};
use crate::paging::PagingWindow;
use crate::schema::{DataSchema, SchemaField};
use crate::{DataPoint, SourceId, UtcDateTime};

const BASE_URL: &str = "https://api.runkeeper.com/";

/// Date bound format for `noEarlierThan`/`noLaterThan` parameters.
const REQUEST_DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Timestamp format RunKeeper uses in responses, e.g.
/// `Sat, 1 Jan 2011 00:00:00`. Values are in the activity's local time,
/// which the feed treats as authoritative.
const RESPONSE_DATE_FORMAT: &[FormatItem<'_>] = format_description!(
    "[weekday repr:short], [day padding:none] [month repr:short] [year] [hour]:[minute]:[second]"
);

fn bearer_credential<'a>(ctx: &'a ServiceContext<'a>) -> Result<&'a str, SourceError> {
    ctx.credential(&format!("bearer_{}", ctx.owner))
}

fn parse_response_timestamp(value: &str) -> Result<UtcDateTime, SourceError> {
    let parsed = PrimitiveDateTime::parse(value, RESPONSE_DATE_FORMAT).map_err(|_| {
        SourceError::malformed(format!("unparsable activity timestamp: '{value}'"))
    })?;
    UtcDateTime::from_offset_datetime(parsed.assume_utc())
        .map_err(|error| SourceError::malformed(error.to_string()))
}

/// Trailing segment of an upstream resource URI, used as the point ID.
fn uri_tail(uri: &str) -> String {
    uri.rsplit('/').next().unwrap_or(uri).to_owned()
}

// ---------------------------------------------------------------------------
// fitness_activities
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ActivityFeed {
    #[serde(default)]
    items: Vec<ActivityRecord>,
}

#[derive(Debug, Deserialize)]
struct ActivityRecord {
    #[serde(rename = "type")]
    kind: String,
    start_time: String,
    total_distance: f64,
    duration: f64,
    uri: String,
}

/// Adapter for the RunKeeper fitness-activities feed.
#[derive(Debug, Default)]
pub struct RunKeeperActivities {
    points: Option<Vec<DataPoint>>,
}

impl RunKeeperActivities {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceAdapter for RunKeeperActivities {
    fn source(&self) -> SourceId {
        SourceId::RunKeeper
    }

    fn stream(&self) -> &'static str {
        "fitness_activities"
    }

    fn has_id(&self) -> bool {
        true
    }

    fn has_timestamp(&self) -> bool {
        true
    }

    fn has_location(&self) -> bool {
        false
    }

    fn describe_schema(&self) -> DataSchema {
        DataSchema::object(vec![
            SchemaField::number("duration"),
            SchemaField::string("start_time"),
            SchemaField::number("total_distance"),
            SchemaField::string("type"),
            SchemaField::string("uri"),
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

            let bearer = bearer_credential(ctx)?;
            let page = window.page_request();

            let mut request = HttpRequest::get(format!("{BASE_URL}fitnessActivities"))
                .with_auth(&HttpAuth::BearerToken(bearer.to_owned()))
                .with_query("page", &page.page.to_string())
                .with_query("pageSize", &page.page_size.to_string());

            if let Some(start) = ctx.start_time {
                let date = start
                    .into_inner()
                    .format(REQUEST_DATE_FORMAT)
                    .map_err(|error| SourceError::internal(error.to_string()))?;
                request = request.with_query("noEarlierThan", &date);
            }
            if let Some(end) = ctx.end_time {
                let date = end
                    .into_inner()
                    .format(REQUEST_DATE_FORMAT)
                    .map_err(|error| SourceError::internal(error.to_string()))?;
                request = request.with_query("noLaterThan", &date);
            }

            let response = ctx
                .http
                .execute(request)
                .await
                .map_err(|error| SourceError::transport(error.to_string()))?;
            if !response.is_success() {
                return Err(SourceError::upstream_status(self.source(), response.status));
            }

            let feed: ActivityFeed = serde_json::from_str(&response.body).map_err(|error| {
                SourceError::malformed(format!("the activity feed was not valid JSON: {error}"))
            })?;

            let mut points = Vec::with_capacity(feed.items.len());
            for record in feed.items {
                let timestamp = parse_response_timestamp(&record.start_time)?;
                points.push(
                    DataPoint::new(json!({
                        "duration": record.duration,
                        "start_time": timestamp.format_rfc3339(),
                        "total_distance": record.total_distance,
                        "type": record.kind,
                        "uri": record.uri,
                    }))
                    .with_id(uri_tail(&record.uri))
                    .with_timestamp(timestamp),
                );
            }

            self.points = Some(page.trim(points, window.num_to_return()));
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

// ---------------------------------------------------------------------------
// profile
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    #[serde(default)]
    birthday: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    elite: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    athlete_type: Option<String>,
    #[serde(default)]
    profile: Option<String>,
}

/// Adapter for the user's RunKeeper profile: a single point with no
/// timestamp, windowed in memory like any other candidate list.
#[derive(Debug, Default)]
pub struct RunKeeperProfile {
    points: Option<Vec<DataPoint>>,
}

impl RunKeeperProfile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceAdapter for RunKeeperProfile {
    fn source(&self) -> SourceId {
        SourceId::RunKeeper
    }

    fn stream(&self) -> &'static str {
        "profile"
    }

    fn has_id(&self) -> bool {
        true
    }

    fn has_timestamp(&self) -> bool {
        false
    }

    fn has_location(&self) -> bool {
        false
    }

    fn describe_schema(&self) -> DataSchema {
        DataSchema::object(vec![
            SchemaField::string("birthday").optional(),
            SchemaField::string("location").optional(),
            SchemaField::string("name").optional(),
            SchemaField::string("elite").optional(),
            SchemaField::string("gender").optional(),
            SchemaField::string("athlete_type").optional(),
            SchemaField::string("profile").optional(),
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

            let bearer = bearer_credential(ctx)?;
            let request = HttpRequest::get(format!("{BASE_URL}profile"))
                .with_auth(&HttpAuth::BearerToken(bearer.to_owned()));

            let response = ctx
                .http
                .execute(request)
                .await
                .map_err(|error| SourceError::transport(error.to_string()))?;
            if !response.is_success() {
                return Err(SourceError::upstream_status(self.source(), response.status));
            }

            let record: ProfileRecord = serde_json::from_str(&response.body).map_err(|error| {
                SourceError::malformed(format!("the profile was not valid JSON: {error}"))
            })?;

            let mut data = serde_json::Map::new();
            let fields = [
                ("birthday", &record.birthday),
                ("location", &record.location),
                ("name", &record.name),
                ("elite", &record.elite),
                ("gender", &record.gender),
                ("athlete_type", &record.athlete_type),
                ("profile", &record.profile),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    data.insert(name.to_owned(), serde_json::Value::String(value.clone()));
                }
            }

            let mut point = DataPoint::new(serde_json::Value::Object(data));
            if let Some(profile) = &record.profile {
                point = point.with_id(uri_tail(profile));
            }

            self.points = Some(window.window(vec![point]));
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

    fn activity_feed() -> String {
        json!({
            "size": 5,
            "items": [
                {"type": "Running", "start_time": "Fri, 5 Jan 2024 07:10:00",
                 "total_distance": 5200.0, "duration": 1800.0,
                 "uri": "/fitnessActivities/15"},
                {"type": "Cycling", "start_time": "Thu, 4 Jan 2024 18:00:00",
                 "total_distance": 20000.0, "duration": 3600.0,
                 "uri": "/fitnessActivities/14"},
                {"type": "Walking", "start_time": "Wed, 3 Jan 2024 12:30:00",
                 "total_distance": 2500.0, "duration": 1500.0,
                 "uri": "/fitnessActivities/13"},
                {"type": "Running", "start_time": "Tue, 2 Jan 2024 07:05:00",
                 "total_distance": 5100.0, "duration": 1750.0,
                 "uri": "/fitnessActivities/12"},
                {"type": "Running", "start_time": "Mon, 1 Jan 2024 07:00:00",
                 "total_distance": 5000.0, "duration": 1700.0,
                 "uri": "/fitnessActivities/11"},
            ],
        })
        .to_string()
    }

    fn run_keeper_credentials() -> BTreeMap<String, String> {
        BTreeMap::from([(String::from("bearer_alice"), String::from("rk-token"))])
    }

    async fn service_activities(
        client: &ScriptedHttpClient,
        window: PagingWindow,
    ) -> Result<RunKeeperActivities, SourceError> {
        let credentials = run_keeper_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: client,
            tokens: &tokens,
        };

        let mut adapter = RunKeeperActivities::new();
        adapter.service(&ctx, window).await?;
        Ok(adapter)
    }

    #[tokio::test]
    async fn requests_the_reconciled_page_and_discards_the_prefix() {
        let client = ScriptedHttpClient::new().respond_ok(activity_feed());
        let window = PagingWindow::new(3, 2).expect("valid window");

        let adapter = service_activities(&client, window)
            .await
            .expect("service succeeds");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("page=0"));
        assert!(requests[0].url.contains("pageSize=5"));
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer rk-token")
        );

        assert_eq!(adapter.num_data_points().expect("serviced"), 2);
        let points = adapter.respond(None).expect("serviced");
        assert_eq!(points[0]["metadata"]["id"], json!("12"));
        assert_eq!(points[1]["metadata"]["id"], json!("11"));
    }

    #[tokio::test]
    async fn second_service_call_is_a_no_op() {
        let client = ScriptedHttpClient::new().respond_ok(activity_feed());
        let credentials = run_keeper_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let window = PagingWindow::new(0, 10).expect("valid window");
        let mut adapter = RunKeeperActivities::new();
        adapter.service(&ctx, window).await.expect("first call");
        adapter.service(&ctx, window).await.expect("no-op");

        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn upstream_error_status_fails_the_service() {
        let client = ScriptedHttpClient::new().respond_status(502, "bad gateway");
        let window = PagingWindow::new(0, 10).expect("valid window");

        let err = service_activities(&client, window)
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Upstream);
    }

    #[tokio::test]
    async fn malformed_feed_leaves_no_points_behind() {
        let client = ScriptedHttpClient::new().respond_ok("{\"items\": [{\"type\": 7}]}");
        let window = PagingWindow::new(0, 10).expect("valid window");

        let credentials = run_keeper_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let mut adapter = RunKeeperActivities::new();
        let err = adapter.service(&ctx, window).await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::MalformedPayload);
        assert!(adapter.num_data_points().is_err());
        assert!(adapter.respond(None).is_err());
    }

    #[tokio::test]
    async fn missing_bearer_credential_is_a_hard_failure() {
        let client = ScriptedHttpClient::new().respond_ok(activity_feed());
        let credentials = BTreeMap::new();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let mut adapter = RunKeeperActivities::new();
        let err = adapter
            .service(&ctx, PagingWindow::default())
            .await
            .expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::MissingCredentials);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn profile_yields_a_single_point_without_timestamp_metadata() {
        let client = ScriptedHttpClient::new().respond_ok(
            json!({
                "name": "Alice Example",
                "gender": "F",
                "profile": "http://runkeeper.com/user/alice-example",
            })
            .to_string(),
        );

        let credentials = run_keeper_credentials();
        let tokens = TokenCache::new();
        let ctx = ServiceContext {
            owner: "alice",
            credentials: &credentials,
            start_time: None,
            end_time: None,
            http: &client,
            tokens: &tokens,
        };

        let mut adapter = RunKeeperProfile::new();
        adapter
            .service(&ctx, PagingWindow::default())
            .await
            .expect("service succeeds");

        assert_eq!(adapter.num_data_points().expect("serviced"), 1);
        let points = adapter.respond(None).expect("serviced");
        assert_eq!(points[0]["metadata"]["id"], json!("alice-example"));
        assert!(points[0]["metadata"].get("timestamp").is_none());
        assert_eq!(points[0]["data"]["name"], json!("Alice Example"));
        assert!(points[0]["data"].get("birthday").is_none());
    }
}
