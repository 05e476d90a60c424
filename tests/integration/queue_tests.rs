//! Outbound queue integration tests: ordering, retry and shutdown.

use std::thread;
use std::time::Duration;

use bleremote::events::{EventHub, GuiEvent};
use bleremote::protocol::{OutboundQueue, QueueConfig, QueuePhase};

use super::mock_transport::{MockTransport, RecordingSink};

const WAIT: Duration = Duration::from_secs(5);

fn config(client_limit: usize) -> QueueConfig {
    QueueConfig {
        retry_backoff: Duration::from_millis(1),
        client_limit,
        ..QueueConfig::default()
    }
}

#[test]
fn parts_arrive_in_order_per_subscriber() {
    let transport = MockTransport::connected(20);
    let queue = OutboundQueue::start(transport.clone(), EventHub::new(), config(2)).unwrap();
    assert!(queue.add_subscriber(1));
    assert!(queue.add_subscriber(2));

    assert!(queue.enqueue(vec![b"a1".to_vec(), b"a2".to_vec()]));
    assert!(queue.enqueue(vec![b"b1".to_vec()]));
    assert!(queue.wait_idle(WAIT));

    let expected = [b"a1".to_vec(), b"a2".to_vec(), b"b1".to_vec()];
    assert_eq!(transport.sent_to(1), expected);
    assert_eq!(transport.sent_to(2), expected);
    // Whole message to subscriber 1 before subscriber 2.
    let order: Vec<u16> = transport.sent().iter().map(|(s, _)| *s).collect();
    assert_eq!(order, [1, 1, 2, 2, 1, 2]);
}

#[test]
fn stalled_transport_is_retried_without_loss() {
    let transport = MockTransport::connected(20);
    let queue = OutboundQueue::start(transport.clone(), EventHub::new(), config(1)).unwrap();
    queue.add_subscriber(7);
    transport.stall(5);

    for i in 0..4u8 {
        queue.enqueue(vec![vec![i]]);
    }
    assert!(queue.wait_idle(WAIT));
    assert_eq!(transport.stalls_seen(), 5);
    assert_eq!(
        transport.sent_to(7),
        [vec![0], vec![1], vec![2], vec![3]]
    );
}

#[test]
fn unsubscribed_clients_are_not_sent_to() {
    let transport = MockTransport::connected(20);
    let queue = OutboundQueue::start(transport.clone(), EventHub::new(), config(1)).unwrap();
    queue.enqueue(vec![b"nobody".to_vec()]);
    assert!(queue.wait_idle(WAIT));
    assert!(transport.sent().is_empty());

    queue.add_subscriber(3);
    assert!(queue.remove_subscriber(3));
    assert!(!queue.remove_subscriber(3));
    queue.enqueue(vec![b"still nobody".to_vec()]);
    assert!(queue.wait_idle(WAIT));
    assert!(transport.sent().is_empty());
}

#[test]
fn shutdown_stops_worker_and_refuses_work() {
    let transport = MockTransport::connected(20);
    let events = EventHub::new();
    let sink = RecordingSink::new();
    events.set_sink(sink.clone());
    let queue = OutboundQueue::start(transport.clone(), events, config(1)).unwrap();
    queue.add_subscriber(1);

    // Never drains: every send reports a full buffer.
    transport.stall(usize::MAX);
    queue.enqueue(vec![b"stuck".to_vec()]);
    queue.enqueue(vec![b"queued".to_vec()]);
    assert!(!queue.wait_idle(Duration::from_millis(50)));

    queue.shutdown();
    assert_eq!(queue.phase(), QueuePhase::ShuttingDown);
    assert_eq!(queue.pending(), 0);
    assert!(!queue.enqueue(vec![b"late".to_vec()]));
    assert!(transport.sent().is_empty());
    assert_eq!(sink.count(|e| *e == GuiEvent::WorkerStopped), 1);

    // Idempotent.
    queue.shutdown();
}

#[test]
fn concurrent_producers_keep_their_own_order_through_retries() {
    const PER_PRODUCER: u8 = 40;

    let transport = MockTransport::connected(20);
    let queue = OutboundQueue::start(transport.clone(), EventHub::new(), config(1)).unwrap();
    queue.add_subscriber(1);
    transport.stall(30);

    thread::scope(|s| {
        for producer in [b'a', b'b'] {
            let queue = &queue;
            s.spawn(move || {
                for seq in 0..PER_PRODUCER {
                    assert!(queue.enqueue(vec![vec![producer, seq], vec![producer, seq, 0xFF]]));
                }
            });
        }
    });
    assert!(queue.wait_idle(WAIT));
    assert_eq!(transport.stalls_seen(), 30);

    let received = transport.sent_to(1);
    assert_eq!(received.len(), 2 * 2 * usize::from(PER_PRODUCER));
    // Each envelope is directly followed by its own continuation.
    for pair in received.chunks(2) {
        assert_eq!(pair[1], [pair[0][0], pair[0][1], 0xFF]);
    }
    for producer in [b'a', b'b'] {
        let seqs: Vec<u8> = received
            .chunks(2)
            .filter(|pair| pair[0][0] == producer)
            .map(|pair| pair[0][1])
            .collect();
        assert_eq!(seqs, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn shutdown_mid_message_still_completes_it() {
    let transport = MockTransport::connected(20);
    let queue = OutboundQueue::start(
        transport.clone(),
        EventHub::new(),
        QueueConfig {
            retry_backoff: Duration::from_millis(20),
            ..config(1)
        },
    )
    .unwrap();
    queue.add_subscriber(1);
    queue.enqueue(vec![b"warmup".to_vec()]);
    assert!(queue.wait_idle(WAIT));
    transport.clear();

    // The envelope goes out; the continuation hits a full buffer.
    transport.stall_after(1, 4);
    queue.enqueue(vec![b"envelope".to_vec(), b"continuation".to_vec()]);
    while transport.sent().is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    queue.shutdown();

    assert_eq!(
        transport.sent_to(1),
        [b"envelope".to_vec(), b"continuation".to_vec()]
    );
    assert_eq!(queue.subscriber_count(), 1);
}
