mod common;

use common::{numbered_events, scripted_sender, scripted_sender_with};
use rask_measurement_forwarder::buffer::BatchConfig;
use rask_measurement_forwarder::domain::Event;
use rask_measurement_forwarder::sender::{
    RequiredFieldPolicy, SenderConfig, SubmissionProblem, SubmissionState,
};
use serde_json::json;

#[tokio::test]
async fn test_sixty_events_sent_in_three_batches_and_cleared() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0001");
    for event in numbered_events(60) {
        sender.add_event(event);
    }

    let report = sender.submit().await.expect("all batches accepted");

    assert_eq!(transport.batch_sizes(), vec![25, 25, 10]);
    assert_eq!(report.batches_planned, 3);
    assert_eq!(report.batches_sent, 3);
    assert_eq!(report.events_sent, 60);
    assert!(sender.events().is_empty());
    assert_eq!(sender.last_state(), SubmissionState::Succeeded);

    // Order is preserved across batches and no session fields were added.
    let indexes: Vec<u64> = transport
        .bodies()
        .iter()
        .flat_map(|body| body["events"].as_array().cloned().unwrap_or_default())
        .map(|event| {
            assert!(event["params"].get("session_id").is_none());
            assert!(event["params"].get("debug_mode").is_none());
            event["params"]["index"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(indexes, (0..60).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_session_fields_stamped_and_empty_body_keeps_events() {
    let (mut sender, transport) = scripted_sender(false);
    sender
        .set_client_id("555.0002")
        .set_session_id(42)
        .set_debug_mode(true);
    for event in numbered_events(10) {
        sender.add_event(event);
    }
    transport.respond(200, "");

    let error = sender.submit().await.expect_err("empty body is a problem");

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 1);
    let events = bodies[0]["events"].as_array().unwrap();
    assert_eq!(events.len(), 10);
    for event in events {
        assert_eq!(event["params"]["session_id"], json!(42));
        assert_eq!(event["params"]["debug_mode"], json!(1));
    }

    assert_eq!(error.problems, vec![SubmissionProblem::EmptyBody]);
    assert!(error.contains("Received not body"));
    assert_eq!(sender.events().len(), 10);
    assert_eq!(sender.last_state(), SubmissionState::Failed);

    // Stored events never carry the stamped fields.
    assert!(
        sender
            .events()
            .iter()
            .all(|event| event.param("session_id").is_none() && event.param("debug_mode").is_none())
    );
}

#[tokio::test]
async fn test_oversized_batch_skipped_and_next_batch_sent() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0003");
    sender.add_event(Event::new("huge").with_param("blob", "x".repeat(140 * 1024)));
    for event in numbered_events(25) {
        sender.add_event(event);
    }

    let error = sender.submit().await.expect_err("first batch is too large");

    // Batch 0 (huge + 24 events) is skipped; batch 1 (1 event) is sent.
    assert_eq!(transport.batch_sizes(), vec![1]);
    assert_eq!(error.messages(), vec!["Request body exceeds 130kB"]);
    assert!(matches!(
        error.problems[0],
        SubmissionProblem::BodyTooLarge { batch_index: 0, .. }
    ));
    assert_eq!(error.report.batches_planned, 2);
    assert_eq!(error.report.batches_sent, 1);
    assert_eq!(sender.events().len(), 26);
}

#[tokio::test]
async fn test_validation_messages_become_problems() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0004");
    sender.add_event(Event::new("purchase"));
    transport.respond(
        200,
        r#"{"validationMessages":[
            {"fieldPath":"events.params.currency","description":"Currency missing","validationCode":"VALUE_REQUIRED"},
            {"description":"Bad event name","validationCode":"NAME_INVALID"}
        ]}"#,
    );

    let error = sender.submit().await.unwrap_err();

    assert_eq!(
        error.messages(),
        vec![
            "Validation Message: VALUE_REQUIRED[events.params.currency]: Currency missing",
            "Validation Message: NAME_INVALID: Bad event name",
        ]
    );
    assert_eq!(sender.events().len(), 1);
}

#[tokio::test]
async fn test_failures_in_every_batch_are_aggregated_in_order() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0005");
    for event in numbered_events(75) {
        sender.add_event(event);
    }
    transport.respond(500, "");
    transport.fail("connect timed out");
    transport.respond(200, "not json");

    let error = sender.submit().await.unwrap_err();

    assert_eq!(transport.requests().len(), 3);
    assert_eq!(
        error.messages(),
        vec![
            "Request received code 500",
            "Received not body",
            "Request failed: Request timeout: connect timed out",
            "Could not parse response",
        ]
    );
    assert_eq!(error.report.batches_sent, 2);
    assert_eq!(sender.events().len(), 75);
}

#[tokio::test]
async fn test_retry_after_failure_sends_everything_again() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0006");
    for event in numbered_events(30) {
        sender.add_event(event);
    }
    transport.respond(503, "");

    assert!(sender.submit().await.is_err());
    assert_eq!(sender.events().len(), 30);

    let report = sender.submit().await.unwrap();
    assert_eq!(report.events_sent, 30);
    assert!(sender.events().is_empty());
    assert_eq!(transport.batch_sizes(), vec![25, 5, 25, 5]);

    // Nothing left: a further submit is a no-op success.
    let report = sender.submit().await.unwrap();
    assert_eq!(report.batches_sent, 0);
    assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn test_missing_identity_blocks_dispatch_by_default() {
    let (mut sender, transport) = scripted_sender(false);
    sender.add_event(Event::new("login"));

    let error = sender.submit().await.unwrap_err();

    assert!(transport.requests().is_empty());
    assert_eq!(
        error.problems,
        vec![SubmissionProblem::MissingRequiredFields {
            fields: vec!["client_id"]
        }]
    );
    assert_eq!(sender.events().len(), 1);
}

#[tokio::test]
async fn test_lenient_policy_dispatches_without_identity() {
    let config = SenderConfig {
        required_fields: RequiredFieldPolicy::Lenient,
        ..SenderConfig::default()
    };
    let (mut sender, transport) = scripted_sender_with(config, false);
    sender.add_event(Event::new("login"));

    sender.submit().await.unwrap();

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("client_id").is_none());
}

#[tokio::test]
async fn test_request_url_and_envelope() {
    let (mut sender, transport) = scripted_sender(false);
    sender
        .set_client_id("555.0007")
        .set_user_id("user-1")
        .set_non_personalized_ads(true);
    sender.add_user_property("plan", "pro").unwrap();
    sender.add_event(Event::new("login"));

    sender.submit().await.unwrap();

    let (url, body) = transport.requests().remove(0);
    assert_eq!(url.path(), "/mp/collect");
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        query,
        vec![
            ("measurement_id".to_string(), "G-TEST123".to_string()),
            ("api_secret".to_string(), "test-secret".to_string()),
        ]
    );
    assert_eq!(
        body,
        json!({
            "client_id": "555.0007",
            "user_id": "user-1",
            "non_personalized_ads": true,
            "user_properties": {"plan": {"value": "pro"}},
            "events": [{"name": "login"}]
        })
    );
}

#[tokio::test]
async fn test_custom_batch_size() {
    let config = SenderConfig {
        batch: BatchConfig {
            max_events: 10,
            ..BatchConfig::default()
        },
        ..SenderConfig::default()
    };
    let (mut sender, transport) = scripted_sender_with(config, false);
    sender.set_client_id("555.0008");
    for event in numbered_events(21) {
        sender.add_event(event);
    }

    sender.submit().await.unwrap();

    assert_eq!(transport.batch_sizes(), vec![10, 10, 1]);
}

#[tokio::test]
async fn test_validate_uses_debug_endpoint_and_keeps_events() {
    let (mut sender, transport) = scripted_sender(false);
    sender.set_client_id("555.0009");
    sender.add_event(Event::new("bad name!"));
    transport.respond(
        200,
        r#"{"validationMessages":[{"description":"Invalid name","validationCode":"NAME_INVALID","fieldPath":"events"}]}"#,
    );

    let messages = sender.validate().await.unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].validation_code, "NAME_INVALID");
    assert_eq!(messages[0].field_path.as_deref(), Some("events"));
    let (url, _) = transport.requests().remove(0);
    assert_eq!(url.path(), "/debug/mp/collect");
    assert_eq!(sender.events().len(), 1);
}
