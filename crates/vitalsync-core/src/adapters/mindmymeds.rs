//! Mind My Meds medication-reminder adapter.
//!
//! Mind My Meds speaks the same read dialect this platform exposes, so the
//! uniform window forwards directly as native skip/return parameters and the
//! response needs no local re-windowing. The user's Mind My Meds account
//! credentials are stored per platform user.

use serde::Deserialize;
use serde_json::json;

use crate::adapters::{ServiceContext, SourceAdapter, SourceError, render_points};
use crate::columns::ColumnNode;
use crate::http_client::HttpRequest;
use crate::paging::PagingWindow;
use crate::schema::{DataSchema, SchemaField};
use crate::{DataPoint, SourceId, UtcDateTime};

const READ_URL: &str = "https://www.mindmymeds.org/omh/v1.0/read";

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    metadata: EntryMetadata,
    data: DoseRecord,
}

#[derive(Debug, Default, Deserialize)]
struct EntryMetadata {
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoseRecord {
    medicine_name: String,
    reminder_sent: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    response_date: Option<String>,
    #[serde(default)]
    doctor: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    dose_info: Option<String>,
}

/// Adapter for the user's medication-reminder history.
#[derive(Debug, Default)]
pub struct MindMyMedsHistory {
    points: Option<Vec<DataPoint>>,
}

impl MindMyMedsHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceAdapter for MindMyMedsHistory {
    fn source(&self) -> SourceId {
        SourceId::MindMyMeds
    }

    fn stream(&self) -> &'static str {
        "history"
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
            SchemaField::string("medicine_name"),
            SchemaField::string("reminder_sent"),
            SchemaField::string("response").optional(),
            SchemaField::string("response_date").optional(),
            SchemaField::string("doctor").optional(),
            SchemaField::string("instruction").optional(),
            SchemaField::string("dose_info").optional(),
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

            let username = ctx.credential(&format!("{}_username", ctx.owner))?;
            let password = ctx.credential(&format!("{}_password", ctx.owner))?;

            let mut request = HttpRequest::get(READ_URL)
                .with_query("user", username)
                .with_query("password", password);

            if let Some(start) = ctx.start_time {
                request = request.with_query("t_start", &start.format_rfc3339());
            }
            if let Some(end) = ctx.end_time {
                request = request.with_query("t_end", &end.format_rfc3339());
            }

            if window.num_to_skip() != 0 {
                request = request.with_query("num_to_skip", &window.num_to_skip().to_string());
            }
            // Return limits may differ between servers, so always send ours.
            request = request.with_query("num_to_return", &window.num_to_return().to_string());

            let response = ctx
                .http
                .execute(request)
                .await
                .map_err(|error| SourceError::transport(error.to_string()))?;
            if !response.is_success() {
                return Err(SourceError::upstream_status(self.source(), response.status));
            }

            let history: HistoryResponse =
                serde_json::from_str(&response.body).map_err(|error| {
                    SourceError::malformed(format!(
                        "the dose history was not valid JSON: {error}"
                    ))
                })?;

            let mut points = Vec::with_capacity(history.data.len());
            for entry in history.data {
                let record = entry.data;
                let mut data = json!({
                    "medicine_name": record.medicine_name,
                    "reminder_sent": record.reminder_sent,
                });
                let optional_fields = [
                    ("response", record.response),
                    ("response_date", record.response_date),
                    ("doctor", record.doctor),
                    ("instruction", record.instruction),
                    ("dose_info", record.dose_info),
                ];
                for (name, value) in optional_fields {
                    if let Some(value) = value {
                        data[name] = json!(value);
                    }
                }

                let mut point = DataPoint::new(data);
                if let Some(timestamp) = entry.metadata.timestamp.as_deref() {
                    let parsed = UtcDateTime::parse(timestamp)
                        .map_err(|error| SourceError::malformed(error.to_string()))?;
                    point = point.with_timestamp(parsed);
                }
                points.push(point);
            }

            // The upstream already applied the skip; only the return cap is
            // enforced locally.
            points.truncate(usize::try_from(window.num_to_return()).unwrap_or(usize::MAX));
            self.points = Some(points);
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
