//! Retry/backoff behaviour of the fetcher against a scripted API.

mod common;

use common::{Event, RecordingObserver, RecordingSleeper, Reply, ScriptedTransport};
use pokepipeline_sync::{FetchOutcome, Fetcher, RetryPolicy};
use serde_json::json;
use std::time::Duration;

const URL: &str = "http://pokeapi.test/api/v2/pokemon/1";

fn fetcher(api: &ScriptedTransport, sleeper: &RecordingSleeper) -> Fetcher {
    Fetcher::new(api.clone(), RetryPolicy::default()).with_sleeper(sleeper.clone())
}

#[test]
fn test_server_error_exhausts_retries() {
    let api = ScriptedTransport::default();
    api.route(URL, Reply::Status(500, "boom".into()));
    let sleeper = RecordingSleeper::default();
    let observer = RecordingObserver::default();

    let out = fetcher(&api, &sleeper).fetch(URL, &observer);

    assert_eq!(out, FetchOutcome::Failed { attempts: 3 });
    assert_eq!(api.calls_to(URL), 3);
    assert_eq!(
        sleeper.naps(),
        vec![
            Duration::from_millis(500),
            Duration::from_millis(1000),
            Duration::from_millis(1500)
        ]
    );
    assert!(sleeper.total() >= Duration::from_millis(500) * (1 + 2 + 3));
    assert_eq!(observer.warnings(), 3);
    assert_eq!(
        observer.failures(),
        vec![format!("Failed to fetch {URL} after 3 attempts.")]
    );
}

#[test]
fn test_not_found_short_circuits() {
    let api = ScriptedTransport::default();
    api.route(URL, Reply::Status(404, "Not Found".into()));
    let sleeper = RecordingSleeper::default();
    let observer = RecordingObserver::default();

    let out = fetcher(&api, &sleeper).fetch(URL, &observer);

    assert_eq!(out, FetchOutcome::NotFound);
    assert_eq!(api.calls_to(URL), 1);
    assert!(sleeper.naps().is_empty());
    assert!(observer.events().is_empty());
}

#[test]
fn test_transient_failures_then_success() {
    let api = ScriptedTransport::default();
    api.route_sequence(
        URL,
        vec![
            Reply::Error("connection reset".into()),
            Reply::Status(503, "busy".into()),
            Reply::json(&json!({ "id": 1 })),
        ],
    );
    let sleeper = RecordingSleeper::default();
    let observer = RecordingObserver::default();

    let out = fetcher(&api, &sleeper).fetch(URL, &observer);

    assert_eq!(out, FetchOutcome::Document(json!({ "id": 1 })));
    assert_eq!(api.calls_to(URL), 3);
    assert_eq!(sleeper.naps().len(), 2);
    assert_eq!(
        observer.events(),
        vec![
            Event::Warning(format!(
                "Request exception for {URL}: connection reset. Attempt 1/3"
            )),
            Event::Warning(format!("{URL} returned status 503. Attempt 2/3")),
        ]
    );
}

#[test]
fn test_custom_policy_bounds_attempts() {
    let api = ScriptedTransport::default();
    api.route(URL, Reply::Error("timed out".into()));
    let sleeper = RecordingSleeper::default();
    let policy = RetryPolicy {
        max_retries: 5,
        backoff: Duration::from_millis(10),
    };

    let out = Fetcher::new(api.clone(), policy)
        .with_sleeper(sleeper.clone())
        .fetch(URL, &RecordingObserver::default());

    assert_eq!(out, FetchOutcome::Failed { attempts: 5 });
    assert_eq!(api.calls().len(), 5);
    assert_eq!(sleeper.total(), Duration::from_millis(10 * (1 + 2 + 3 + 4 + 5)));
}
