//! Contract tests: every registered adapter honors the uniform adapter
//! contract regardless of how its upstream is shaped.

use std::collections::BTreeMap;

use serde_json::json;
use vitalsync_core::{
    AdapterRegistry, PagingWindow, ScriptedHttpClient, ServiceContext, SourceAdapter, SourceId,
    TokenCache,
};

struct AdapterCase {
    source: SourceId,
    stream: &'static str,
    credentials: BTreeMap<String, String>,
    /// Upstream responses, in the order the adapter requests them.
    responses: Vec<String>,
}

fn adapter_cases() -> Vec<AdapterCase> {
    vec![
        AdapterCase {
            source: SourceId::RunKeeper,
            stream: "profile",
            credentials: BTreeMap::from([(
                String::from("bearer_alice"),
                String::from("rk-token"),
            )]),
            responses: vec![
                json!({"name": "Alice", "profile": "http://runkeeper.com/user/alice"}).to_string(),
            ],
        },
        AdapterCase {
            source: SourceId::RunKeeper,
            stream: "fitness_activities",
            credentials: BTreeMap::from([(
                String::from("bearer_alice"),
                String::from("rk-token"),
            )]),
            responses: vec![
                json!({
                    "items": [
                        {"type": "Running", "start_time": "Mon, 1 Jan 2024 07:00:00",
                         "total_distance": 5000.0, "duration": 1700.0,
                         "uri": "/fitnessActivities/11"},
                    ],
                })
                .to_string(),
            ],
        },
        AdapterCase {
            source: SourceId::BodyMedia,
            stream: "sleep",
            credentials: BTreeMap::from([
                (String::from("api_key"), String::from("bm-key")),
                (String::from("alice_username"), String::from("alice")),
                (String::from("alice_password"), String::from("pw")),
            ]),
            responses: vec![
                json!({"access_token": "bm-access", "expires_in": 300}).to_string(),
                json!({
                    "days": [
                        {"date": "2024-02-01", "totalLying": 470.0,
                         "totalSleep": 420.0, "efficiency": 89.4},
                    ],
                })
                .to_string(),
            ],
        },
        AdapterCase {
            source: SourceId::Entra,
            stream: "glucose",
            credentials: BTreeMap::from([
                (String::from("app_id"), String::from("app")),
                (String::from("app_password"), String::from("app-pw")),
                (String::from("alice_username"), String::from("alice")),
                (String::from("alice_password"), String::from("pw")),
            ]),
            responses: vec![String::from(
                "<records><record>\
                   <id>r-1</id><date>01/15/2024</date><time>07:45:00</time>\
                   <glucose>98</glucose><testevent>1</testevent>\
                 </record></records>",
            )],
        },
        AdapterCase {
            source: SourceId::MindMyMeds,
            stream: "history",
            credentials: BTreeMap::from([
                (String::from("alice_username"), String::from("alice")),
                (String::from("alice_password"), String::from("pw")),
            ]),
            responses: vec![
                json!({
                    "result": "success",
                    "data": [
                        {"metadata": {"timestamp": "2024-03-01T09:00:00Z"},
                         "data": {"medicine_name": "Metformin",
                                  "reminder_sent": "2024-03-01T08:55:00Z"}},
                    ],
                })
                .to_string(),
            ],
        },
    ]
}

fn resolve(registry: &AdapterRegistry, case: &AdapterCase) -> Box<dyn SourceAdapter> {
    let payload_id = format!("omh:{}:{}:1", case.source, case.stream)
        .parse()
        .expect("well-formed payload ID");
    registry
        .resolve(&payload_id)
        .unwrap_or_else(|_| panic!("adapter '{}:{}' is registered", case.source, case.stream))
}

async fn serviced(case: &AdapterCase, window: PagingWindow) -> Box<dyn SourceAdapter> {
    let registry = AdapterRegistry::with_defaults();
    let mut adapter = resolve(&registry, case);

    let mut client = ScriptedHttpClient::new();
    for response in &case.responses {
        client = client.respond_ok(response.clone());
    }
    let tokens = TokenCache::new();
    let ctx = ServiceContext {
        owner: "alice",
        credentials: &case.credentials,
        start_time: None,
        end_time: None,
        http: &client,
        tokens: &tokens,
    };

    adapter
        .service(&ctx, window)
        .await
        .unwrap_or_else(|error| panic!("'{}:{}' services: {error}", case.source, case.stream));
    adapter
}

#[test]
fn schema_is_describable_before_authentication_or_service() {
    let registry = AdapterRegistry::with_defaults();

    for case in adapter_cases() {
        let adapter = resolve(&registry, &case);

        let schema = serde_json::to_value(adapter.describe_schema())
            .expect("the schema serializes");
        assert_eq!(
            schema["type"],
            json!("object"),
            "'{}:{}': schema root type",
            case.source,
            case.stream
        );
        let fields = schema["schema"].as_array().expect("schema field array");
        assert!(!fields.is_empty(), "'{}:{}': schema fields", case.source, case.stream);
        for field in fields {
            assert!(field["optional"].is_boolean(), "optionality is explicit");
        }
    }
}

#[test]
fn reading_back_an_unserviced_adapter_is_an_error() {
    let registry = AdapterRegistry::with_defaults();

    for case in adapter_cases() {
        let adapter = resolve(&registry, &case);
        assert!(adapter.num_data_points().is_err());
        assert!(adapter.respond(None).is_err());
    }
}

#[tokio::test]
async fn emitted_metadata_matches_the_capability_flags() {
    for case in adapter_cases() {
        let adapter = serviced(&case, PagingWindow::default()).await;

        let points = adapter.respond(None).expect("serviced");
        assert!(!points.is_empty(), "'{}:{}' emits points", case.source, case.stream);

        for point in &points {
            let metadata = point["metadata"].as_object().expect("metadata object");
            assert_eq!(
                metadata.contains_key("id"),
                adapter.has_id(),
                "'{}:{}': id flag",
                case.source,
                case.stream
            );
            assert_eq!(
                metadata.contains_key("timestamp"),
                adapter.has_timestamp(),
                "'{}:{}': timestamp flag",
                case.source,
                case.stream
            );
            assert_eq!(
                metadata.contains_key("location"),
                adapter.has_location(),
                "'{}:{}': location flag",
                case.source,
                case.stream
            );
            assert!(point["data"].is_object(), "data is an object");
        }
    }
}

#[tokio::test]
async fn emitted_count_matches_num_data_points() {
    for case in adapter_cases() {
        let adapter = serviced(&case, PagingWindow::default()).await;

        let count = adapter.num_data_points().expect("serviced");
        let points = adapter.respond(None).expect("serviced");
        assert_eq!(count, points.len(), "'{}:{}'", case.source, case.stream);
    }
}

#[tokio::test]
async fn a_zero_return_window_emits_nothing_for_any_adapter() {
    let window = PagingWindow::new(0, 0).expect("valid window");

    for case in adapter_cases() {
        let adapter = serviced(&case, window).await;
        assert_eq!(
            adapter.num_data_points().expect("serviced"),
            0,
            "'{}:{}'",
            case.source,
            case.stream
        );
    }
}

#[tokio::test]
async fn every_emitted_field_appears_in_the_declared_schema() {
    for case in adapter_cases() {
        let adapter = serviced(&case, PagingWindow::default()).await;

        let schema = serde_json::to_value(adapter.describe_schema())
            .expect("the schema serializes");
        let declared: Vec<&str> = schema["schema"]
            .as_array()
            .expect("schema field array")
            .iter()
            .map(|field| field["name"].as_str().expect("field name"))
            .collect();

        for point in adapter.respond(None).expect("serviced") {
            for key in point["data"].as_object().expect("data object").keys() {
                assert!(
                    declared.contains(&key.as_str()),
                    "'{}:{}': emitted field '{key}' is undeclared",
                    case.source,
                    case.stream
                );
            }
        }
    }
}
