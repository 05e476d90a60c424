//! Client/server loopback: `GuiClient` talking to `GuiServer` through the
//! mock transport.

use std::time::Duration;

use bleremote::config::GuiConfig;
use bleremote::gui::{GuiBuilder, SharedGui};
use bleremote::handler::ValueCell;
use bleremote::protocol::fragment::Reassembler;
use bleremote::protocol::{BROADCAST_REQUEST_ID, ClientEvent, GuiClient, GuiServer};
use bleremote::value::{Rgbw, Value};

use super::mock_transport::MockTransport;

const WAIT: Duration = Duration::from_secs(5);

fn server(budget: u16) -> (GuiServer<MockTransport>, std::sync::Arc<MockTransport>) {
    let gui = SharedGui::new(
        GuiBuilder::new()
            .group("Deck")
            .color_field("Warp", ValueCell::shared(Rgbw::OFF), "RGB")
            .text_field("Label", ValueCell::shared(String::from("Engineering")))
            .max_length(24)
            .end_group()
            .build(),
    );
    let transport = MockTransport::connected(budget);
    let server = GuiServer::new(gui, transport.clone(), &GuiConfig::default()).unwrap();
    server.on_subscribe(1, true);
    (server, transport)
}

fn exchange(
    server: &GuiServer<MockTransport>,
    transport: &MockTransport,
    client: &mut GuiClient,
    request: &[u8],
) -> Vec<ClientEvent> {
    transport.clear();
    server.on_incoming_message(request);
    assert!(server.queue().wait_idle(WAIT));
    transport
        .sent_to(1)
        .iter()
        .filter_map(|m| client.feed(m))
        .collect()
}

#[test]
fn own_requests_are_recognised() {
    let (server, transport) = server(23);
    let mut client = GuiClient::default();

    let (id, req) = client.request_gui();
    let events = exchange(&server, &transport, &mut client, &req);
    let [ClientEvent::GuiData { request_id, own, tree }] = events.as_slice() else {
        panic!("unexpected {events:?}");
    };
    assert_eq!(*request_id, id);
    assert!(*own);
    assert_eq!(tree["elements"][0]["elements"][1]["value"], "Engineering");
    assert_eq!(tree["elements"][0]["elements"][1]["maxLength"], 24);

    let (id, req) = client.set_value(&["Deck", "Warp"], Value::Color(Rgbw::new(0, 128, 255, 0)));
    let events = exchange(&server, &transport, &mut client, &req);
    assert_eq!(
        events,
        [ClientEvent::Update {
            request_id: id,
            own: true,
            path: vec!["Deck".into(), "Warp".into()],
            value: Value::Color(Rgbw::new(0, 128, 255, 0)),
        }]
    );
    server.shutdown();
}

#[test]
fn broadcasts_are_not_own() {
    let (server, transport) = server(64);
    let mut client = GuiClient::default();
    let (_, req) = client.set_value(&["Deck", "Label"], Value::Text("Bridge".into()));
    exchange(&server, &transport, &mut client, &req);

    transport.clear();
    assert!(server.notify_value_change(&["Deck", "Label"]));
    assert!(server.queue().wait_idle(WAIT));
    let events: Vec<ClientEvent> = transport
        .sent_to(1)
        .iter()
        .filter_map(|m| client.feed(m))
        .collect();
    assert!(matches!(
        events.as_slice(),
        [ClientEvent::Update { request_id, own: false, value: Value::Text(t), .. }]
            if *request_id == BROADCAST_REQUEST_ID && t == "Bridge"
    ));
    server.shutdown();
}

#[test]
fn reset_discards_partial_transfer() {
    let (server, transport) = server(12);
    let mut client = GuiClient::new(Reassembler::new(4096));

    let (_, req) = client.request_gui();
    server.on_incoming_message(&req);
    assert!(server.queue().wait_idle(WAIT));
    let parts = transport.sent_to(1);
    assert!(parts.len() > 2);

    // Link drops halfway through the dump.
    assert!(client.feed(&parts[0]).is_none());
    client.reset();
    assert!(parts[1..].iter().all(|m| client.feed(m).is_none()));
    server.shutdown();
}

#[test]
fn oversized_transfer_is_refused_by_client() {
    let (server, transport) = server(64);
    let mut client = GuiClient::new(Reassembler::new(16));
    let (_, req) = client.request_gui();
    let events = exchange(&server, &transport, &mut client, &req);
    assert!(events.is_empty());
    server.shutdown();
}
