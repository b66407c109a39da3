//! Entra glucose-meter adapter.
//!
//! Entra's API is a single endpoint that multiplexes on a `method` query
//! parameter and answers in XML. Authentication is two-layered: the
//! platform's application ID and password plus the member's own stored
//! username and password, all sent as query parameters. The response is a
//! bounded full dump with no native paging, so the uniform window is applied
//! in memory after a reverse-chronological sort.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::json;
use time::PrimitiveDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::adapters::{ServiceContext, SourceAdapter, SourceError, render_points};
use crate::columns::ColumnNode;
use crate::http_client::HttpRequest;
use crate::paging::{PagingWindow, sort_reverse_chronological};
use crate::schema::{DataSchema, SchemaField};
use crate::{DataPoint, SourceId, UtcDateTime};

const API_URL: &str = "https://secure.myentra.com/API.asmx/Execute";

/// Date bound format for the `fromDate`/`toDate` parameters.
const REQUEST_DATE_FORMAT: &[FormatItem<'_>] = format_description!("[month]/[day]/[year]");

/// Record timestamps arrive as separate `date` and `time` elements that are
/// concatenated before parsing.
const RECORD_DATE_TIME_FORMAT: &[FormatItem<'_>] =
    format_description!("[month]/[day]/[year]T[hour]:[minute]:[second]");

/// Maps Entra's numeric test-event codes to their readable labels.
fn test_event_label(code: u32) -> Option<&'static str> {
    match code {
        1 => Some("Before breakfast"),
        2 => Some("After breakfast"),
        3 => Some("Before lunch"),
        4 => Some("After lunch"),
        5 => Some("Before dinner"),
        6 => Some("After dinner"),
        7 => Some("Evening"),
        9 => Some("After exercise"),
        10 => Some("After taking medication"),
        _ => None,
    }
}

/// One glucose reading as parsed out of the XML, before normalization.
#[derive(Debug, Default)]
struct GlucoseRecord {
    id: Option<String>,
    date: Option<String>,
    time: Option<String>,
    glucose: Option<i64>,
    test_event: Option<u32>,
    comment: Option<String>,
}

impl GlucoseRecord {
    fn set_field(&mut self, element: &str, text: &str) -> Result<(), SourceError> {
        match element {
            "id" => self.id = Some(text.to_owned()),
            "date" => self.date = Some(text.to_owned()),
            "time" => self.time = Some(text.to_owned()),
            "glucose" => {
                self.glucose = Some(text.parse().map_err(|_| {
                    SourceError::malformed(format!("the glucose value was not a number: '{text}'"))
                })?);
            }
            "testevent" => {
                self.test_event = Some(text.parse().map_err(|_| {
                    SourceError::malformed(format!(
                        "the test event code was not a number: '{text}'"
                    ))
                })?);
            }
            "comment" => self.comment = Some(text.to_owned()),
            _ => {}
        }
        Ok(())
    }

    fn into_point(self) -> Result<DataPoint, SourceError> {
        let id = self
            .id
            .ok_or_else(|| SourceError::malformed("a record is missing its 'id' element"))?;
        let date = self
            .date
            .ok_or_else(|| SourceError::malformed("a record is missing its 'date' element"))?;
        let time = self
            .time
            .ok_or_else(|| SourceError::malformed("a record is missing its 'time' element"))?;
        let glucose = self
            .glucose
            .ok_or_else(|| SourceError::malformed("a record is missing its 'glucose' element"))?;
        let test_event_code = self.test_event.ok_or_else(|| {
            SourceError::malformed("a record is missing its 'testevent' element")
        })?;

        let test_event = test_event_label(test_event_code).ok_or_else(|| {
            SourceError::malformed(format!("the test event code is unknown: {test_event_code}"))
        })?;

        let concatenated = format!("{date}T{time}");
        let parsed = PrimitiveDateTime::parse(&concatenated, RECORD_DATE_TIME_FORMAT)
            .map_err(|_| {
                SourceError::malformed(format!("unparsable record timestamp: '{concatenated}'"))
            })?;
        let timestamp = UtcDateTime::from_offset_datetime(parsed.assume_utc())
            .map_err(|error| SourceError::malformed(error.to_string()))?;

        let mut data = json!({
            "glucose": glucose,
            "testevent": test_event,
        });
        if let Some(comment) = self.comment {
            data["comment"] = json!(comment);
        }

        Ok(DataPoint::new(data).with_id(id).with_timestamp(timestamp))
    }
}

/// Parses the `<records><record>...</record></records>` response body.
fn parse_records(body: &str) -> Result<Vec<GlucoseRecord>, SourceError> {
    let mut reader = Reader::from_str(body);

    let mut records = Vec::new();
    let mut current: Option<GlucoseRecord> = None;
    let mut element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name == "record" {
                    current = Some(GlucoseRecord::default());
                    element.clear();
                } else {
                    element = name;
                }
            }
            Ok(Event::Text(text)) => {
                // Whitespace between elements arrives as text with no
                // enclosing field element; it is ignored by set_field.
                if let Some(record) = current.as_mut() {
                    let value = text.unescape().map_err(|error| {
                        SourceError::malformed(format!("the XML is invalid: {error}"))
                    })?;
                    let value = value.trim();
                    if !value.is_empty() {
                        record.set_field(&element, value)?;
                    }
                }
            }
            Ok(Event::End(end)) => {
                if end.name().as_ref() == b"record" {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                }
                element.clear();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                return Err(SourceError::malformed(format!(
                    "the XML is not well formed: {error}"
                )));
            }
        }
    }

    Ok(records)
}

/// Adapter for Entra's `getGlucose` method.
#[derive(Debug, Default)]
pub struct EntraGlucose {
    points: Option<Vec<DataPoint>>,
}

impl EntraGlucose {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceAdapter for EntraGlucose {
    fn source(&self) -> SourceId {
        SourceId::Entra
    }

    fn stream(&self) -> &'static str {
        "glucose"
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
            SchemaField::number("glucose"),
            SchemaField::string("testevent"),
            SchemaField::string("comment").optional(),
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

            let app_id = ctx.credential("app_id")?;
            let app_password = ctx.credential("app_password")?;
            let username = ctx.credential(&format!("{}_username", ctx.owner))?;
            let password = ctx.credential(&format!("{}_password", ctx.owner))?;

            let mut request = HttpRequest::get(API_URL)
                .with_query("uid", app_id)
                .with_query("pw", app_password)
                .with_query("mID", username)
                .with_query("mPW", password)
                .with_query("method", "getGlucose");

            if let Some(start) = ctx.start_time {
                let date = start
                    .into_inner()
                    .format(REQUEST_DATE_FORMAT)
                    .map_err(|error| SourceError::internal(error.to_string()))?;
                request = request.with_query("fromDate", &date);
            }
            if let Some(end) = ctx.end_time {
                let date = end
                    .into_inner()
                    .format(REQUEST_DATE_FORMAT)
                    .map_err(|error| SourceError::internal(error.to_string()))?;
                request = request.with_query("toDate", &date);
            }

            let response = ctx
                .http
                .execute(request)
                .await
                .map_err(|error| SourceError::transport(error.to_string()))?;
            if !response.is_success() {
                return Err(SourceError::upstream_status(self.source(), response.status));
            }

            let mut points = Vec::new();
            for record in parse_records(&response.body)? {
                points.push(record.into_point()?);
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
