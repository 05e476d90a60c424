//! GUI server integration tests.
//!
//! Drive `GuiServer` through encoded client requests and inspect what the
//! mock transport actually delivered.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bleremote::config::GuiConfig;
use bleremote::error::{DecodeError, TransmitError};
use bleremote::events::GuiEvent;
use bleremote::gui::{GuiBuilder, SharedGui};
use bleremote::handler::{DataHandler, Int32Handler, ValueCell};
use bleremote::protocol::codec::{ClientRequest, encode_request};
use bleremote::protocol::{BROADCAST_REQUEST_ID, ClientEvent, GuiServer, SendError};
use bleremote::value::Value;

use super::mock_transport::{MockTransport, RecordingSink, decode_all};

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    server: GuiServer<MockTransport>,
    transport: Arc<MockTransport>,
    sink: Arc<RecordingSink>,
    brightness: Arc<ValueCell<i32>>,
    pin: Arc<ValueCell<String>>,
    presses: Arc<AtomicUsize>,
}

fn fixture_with(budget: u16, config: GuiConfig) -> Fixture {
    let brightness = ValueCell::shared(10);
    let pin = ValueCell::shared(String::from("0000"));
    let presses = Arc::new(AtomicUsize::new(0));
    let p = presses.clone();
    let heading: Int32Handler = ValueCell::shared(90);

    let gui = SharedGui::new(
        GuiBuilder::new()
            .group("Lights")
            .range("Brightness", 0, 100, brightness.clone())
            .drop_down("Mode", &["Steady", "Pulse"], ValueCell::shared(0))
            .end_group()
            .password_field("PIN", pin.clone())
            .text_field("Secret", ValueCell::shared(String::from("hidden")))
            .send_value_to_client(false)
            .button("Ping", Arc::new(move || {
                p.fetch_add(1, Ordering::SeqCst);
            }))
            .compass("Heading", heading)
            .build(),
    );

    let transport = MockTransport::connected(budget);
    let server = GuiServer::new(gui, transport.clone(), &config).unwrap();
    let sink = RecordingSink::new();
    server.set_event_sink(sink.clone());
    Fixture {
        server,
        transport,
        sink,
        brightness,
        pin,
        presses,
    }
}

fn fixture() -> Fixture {
    fixture_with(20, GuiConfig::default())
}

fn set(id: u32, path: &str, value: Value) -> Vec<u8> {
    encode_request(
        id,
        &ClientRequest::SetValue {
            path: path.into(),
            value,
        },
    )
}

// ── RequestGUI ────────────────────────────────────────────────

#[test]
fn request_gui_answers_with_structural_dump() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server
        .on_incoming_message(&encode_request(0x11, &ClientRequest::RequestGui));
    assert!(f.server.queue().wait_idle(WAIT));

    let sent = f.transport.sent_to(1);
    assert!(sent.len() > 1, "dump must be split at a 20-byte budget");
    assert!(sent.iter().all(|m| m.len() <= 20));

    let events = decode_all(&sent);
    let [ClientEvent::GuiData { request_id, tree, .. }] = events.as_slice() else {
        panic!("expected one GUI dump, got {events:?}");
    };
    assert_eq!(*request_id, 0x11);
    assert_eq!(tree["type"], "root");
    assert_eq!(tree["elements"][0]["name"], "Lights");
    assert_eq!(tree["elements"][0]["elements"][0]["value"], 10);
    // Confidential values never leave the device.
    assert_eq!(tree["elements"][1]["value"], "");
    assert_eq!(tree["elements"][2]["value"], "");
    f.server.shutdown();
}

// ── SetValue ──────────────────────────────────────────────────

#[test]
fn set_value_replies_with_clamped_value() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server
        .on_incoming_message(&set(7, "Lights,Brightness", Value::Integer(500)));
    assert!(f.server.queue().wait_idle(WAIT));

    assert_eq!(f.brightness.get(), 100);
    assert_eq!(
        decode_all(&f.transport.sent_to(1)),
        [ClientEvent::Update {
            request_id: 7,
            own: false,
            path: vec!["Lights".into(), "Brightness".into()],
            value: Value::Integer(100),
        }]
    );
    f.server.shutdown();
}

#[test]
fn password_write_is_applied_but_masked() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server
        .on_incoming_message(&set(8, "PIN", Value::Text("1234".into())));
    f.server
        .on_incoming_message(&set(9, "Secret", Value::Text("new".into())));
    assert!(f.server.queue().wait_idle(WAIT));

    assert_eq!(f.pin.get(), "1234");
    let values: Vec<Value> = decode_all(&f.transport.sent_to(1))
        .into_iter()
        .map(|e| match e {
            ClientEvent::Update { value, .. } => value,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(values, [Value::Text(String::new()), Value::Text(String::new())]);
    f.server.shutdown();
}

#[test]
fn button_write_fires_trigger() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server.on_incoming_message(&set(3, "Ping", Value::Boolean(true)));
    f.server.on_incoming_message(&set(4, "Ping", Value::Integer(0)));
    assert!(f.server.queue().wait_idle(WAIT));
    assert_eq!(f.presses.load(Ordering::SeqCst), 2);
    f.server.shutdown();
}

#[test]
fn rejected_writes_get_no_reply() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server.on_incoming_message(&set(1, "Lights,Missing", Value::Integer(1)));
    f.server.on_incoming_message(&set(2, "Heading", Value::Integer(180)));
    f.server.on_incoming_message(&set(3, "Lights", Value::Integer(1)));
    assert!(f.server.queue().wait_idle(WAIT));

    assert!(f.transport.sent().is_empty());
    assert_eq!(
        f.sink
            .count(|e| matches!(e, GuiEvent::WriteRejected { .. })),
        3
    );
    assert_eq!(
        f.server.gui().get_value(&["Heading"]),
        Some(Value::Integer(90))
    );
    f.server.shutdown();
}

// ── Malformed input ───────────────────────────────────────────

#[test]
fn malformed_requests_change_nothing() {
    let f = fixture();
    f.server.on_subscribe(1, true);

    let mut truncated = set(5, "Lights,Brightness", Value::Integer(50));
    truncated.truncate(truncated.len() - 2);
    let mut bad_type = set(6, "Lights,Brightness", Value::Integer(50));
    let tag_at = bad_type.len() - 5;
    bad_type[tag_at] = 0x7f;

    f.server.on_incoming_message(&[]);
    f.server.on_incoming_message(&[0x09, 0, 0, 0, 1]);
    f.server.on_incoming_message(&truncated);
    f.server.on_incoming_message(&bad_type);
    assert!(f.server.queue().wait_idle(WAIT));

    assert_eq!(f.brightness.get(), 10);
    assert!(f.transport.sent().is_empty());
    let dropped: Vec<DecodeError> = f
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GuiEvent::RequestDropped(d) => Some(d),
            _ => None,
        })
        .collect();
    assert_eq!(dropped.len(), 4);
    assert_eq!(dropped[0], DecodeError::Empty);
    assert_eq!(dropped[1], DecodeError::UnknownKind(0x09));
    assert_eq!(dropped[3], DecodeError::UnknownValueType(0x7f));
    f.server.shutdown();
}

// ── Broadcasts ────────────────────────────────────────────────

#[test]
fn broadcast_reaches_each_subscriber_once() {
    let config = GuiConfig {
        client_limit: 2,
        ..GuiConfig::default()
    };
    let f = fixture_with(20, config);
    f.server.on_subscribe(1, true);
    f.server.on_subscribe(2, true);

    f.brightness.set(42);
    assert!(f.server.notify_value_change(&["Lights", "Brightness"]));
    assert!(!f.server.notify_value_change(&["Lights", "Nope"]));
    assert!(f.server.queue().wait_idle(WAIT));

    for sub in [1, 2] {
        let events = decode_all(&f.transport.sent_to(sub));
        assert_eq!(
            events,
            [ClientEvent::Update {
                request_id: BROADCAST_REQUEST_ID,
                own: false,
                path: vec!["Lights".into(), "Brightness".into()],
                value: Value::Integer(42),
            }],
            "subscriber {sub}"
        );
    }
    f.server.shutdown();
}

#[test]
fn application_write_is_broadcast() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    assert!(f
        .server
        .set_value_and_notify(&["Lights", "Mode"], &Value::Integer(9)));
    assert!(f.server.queue().wait_idle(WAIT));

    // Index clamps to the last item.
    let events = decode_all(&f.transport.sent_to(1));
    assert!(matches!(
        events.as_slice(),
        [ClientEvent::Update { value: Value::Integer(1), .. }]
    ));
    f.server.shutdown();
}

#[test]
fn concurrent_writers_broadcast_in_commit_order() {
    let f = fixture_with(64, GuiConfig::default());
    f.server.on_subscribe(1, true);

    std::thread::scope(|s| {
        for offset in [0, 1] {
            let server = &f.server;
            s.spawn(move || {
                for i in 0..50 {
                    let value = Value::Integer(2 * i + offset);
                    assert!(server.set_value_and_notify(&["Lights", "Brightness"], &value));
                }
            });
        }
    });
    assert!(f.server.queue().wait_idle(WAIT));

    let events = decode_all(&f.transport.sent_to(1));
    assert_eq!(events.len(), 100);
    let Some(ClientEvent::Update { value, .. }) = events.last() else {
        panic!("expected updates, got {events:?}");
    };
    // The last broadcast matches what the tree ended up holding.
    assert_eq!(*value, Value::Integer(f.brightness.get()));
    f.server.shutdown();
}

#[test]
fn subscriber_limit_is_enforced() {
    let f = fixture();
    f.server.on_subscribe(1, true);
    f.server.on_subscribe(2, true);
    assert_eq!(f.server.queue().subscriber_count(), 1);
    assert_eq!(
        f.sink.count(|e| matches!(
            e,
            GuiEvent::SubscriberChanged {
                subscribed: true,
                ..
            }
        )),
        1
    );
    f.server.on_subscribe(1, false);
    f.server.on_subscribe(2, true);
    assert_eq!(f.server.queue().subscriber_count(), 1);
    f.server.shutdown();
}

// ── Transmit gates ────────────────────────────────────────────

#[test]
fn budget_below_minimum_is_reported() {
    let f = fixture_with(9, GuiConfig::default());
    f.server.on_subscribe(1, true);
    f.server
        .on_incoming_message(&encode_request(1, &ClientRequest::RequestGui));
    assert!(f.server.queue().wait_idle(WAIT));

    assert!(f.transport.sent().is_empty());
    assert_eq!(
        f.sink.events().last(),
        Some(&GuiEvent::TransmitSkipped {
            request_id: 1,
            reason: TransmitError::BudgetTooSmall { budget: 9 },
        })
    );
    f.server.shutdown();
}

#[test]
fn nothing_is_sent_without_link_or_subscribers() {
    let f = fixture();
    f.server.notify_value_change(&["Lights", "Brightness"]);
    f.transport.set_budget(None);
    f.server.on_subscribe(1, true);
    f.server.notify_value_change(&["Lights", "Brightness"]);
    assert!(f.server.queue().wait_idle(WAIT));

    assert!(f.transport.sent().is_empty());
    let reasons: Vec<TransmitError> = f
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GuiEvent::TransmitSkipped { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, [TransmitError::NoSubscribers, TransmitError::NoLink]);
    f.server.shutdown();
}

// ── Delivery ──────────────────────────────────────────────────

#[test]
fn full_buffer_is_retried_in_order() {
    let f = fixture_with(10, GuiConfig::default());
    f.server.on_subscribe(1, true);
    f.transport.stall(3);
    f.server
        .on_incoming_message(&encode_request(0x21, &ClientRequest::RequestGui));
    f.server
        .on_incoming_message(&set(0x22, "Lights,Brightness", Value::Integer(55)));
    assert!(f.server.queue().wait_idle(WAIT));

    assert_eq!(f.transport.stalls_seen(), 3);
    let ids: Vec<u32> = decode_all(&f.transport.sent_to(1))
        .into_iter()
        .map(|e| match e {
            ClientEvent::GuiData { request_id, .. } | ClientEvent::Update { request_id, .. } => {
                request_id
            }
        })
        .collect();
    assert_eq!(ids, [0x21, 0x22]);
    f.server.shutdown();
}

#[test]
fn permanent_failure_skips_only_that_subscriber() {
    let config = GuiConfig {
        client_limit: 2,
        ..GuiConfig::default()
    };
    let f = fixture_with(20, config);
    f.server.on_subscribe(1, true);
    f.server.on_subscribe(2, true);
    f.transport.fail_for(1, SendError::Io(-1));

    assert!(f.server.notify_value_change(&["Lights", "Brightness"]));
    assert!(f.server.queue().wait_idle(WAIT));

    assert!(f.transport.sent_to(1).is_empty());
    assert_eq!(decode_all(&f.transport.sent_to(2)).len(), 1);
    assert!(f.sink.events().contains(&GuiEvent::DeliveryFailed {
        subscriber: 1,
        error: SendError::Io(-1),
    }));
    f.server.shutdown();
}
