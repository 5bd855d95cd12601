use std::time::Duration;

use bacnode::ObjectStore;
use bacnode::PropertyId;
use bacnode::PropertyValue;
use bacnode::Request;
use bacnode::Response;
use bacnode::SubscriptionRegistry;
use bacnode::Value;

use crate::common::av0;
use crate::common::peer;
use crate::common::Peer;
use crate::common::TestNode;

fn subscribe_pv(
    invoke_id: u8,
    lifetime: u32,
    cancellation: bool,
) -> Request {
    Request::SubscribeCov {
        invoke_id,
        process_id: 1,
        object_id: av0(),
        property: Some(PropertyId::PRESENT_VALUE.into()),
        cancellation,
        issue_confirmed: true,
        lifetime,
        cov_increment: None,
    }
}

fn pv(value: f32) -> PropertyValue {
    PropertyValue::new(PropertyId::PRESENT_VALUE, vec![Value::Real(value)])
}

#[tokio::test]
async fn test_write_is_notified_to_confirmed_subscriber() {
    let t = TestNode::start();
    t.node.dispatch(peer(1), subscribe_pv(1, 60, false)).await.unwrap();
    t.settle().await;

    let ack = t
        .node
        .dispatch(
            peer(2),
            Request::WriteProperty {
                invoke_id: 2,
                object_id: av0(),
                value: pv(42.0),
            },
        )
        .await
        .unwrap();
    t.settle().await;

    assert!(matches!(ack, Some(Response::SimpleAck { .. })));
    let sent = t.transport.notifications();
    // initial notification, then the write
    assert_eq!(sent.len(), 2);
    let n = &sent[1];
    assert_eq!(n.address, peer(1));
    assert!(n.confirmed);
    assert_eq!(n.values, vec![pv(42.0)]);
    assert!(n.time_remaining <= 60);
}

#[tokio::test]
async fn test_three_writes_in_one_tick_send_only_the_last_value() {
    let t = TestNode::start();
    t.node.dispatch(peer(1), subscribe_pv(1, 60, false)).await.unwrap();
    t.settle().await;
    let reads_before = t.store.reads();

    for value in [10.0, 20.0, 30.0] {
        t.store.write_property(av0(), pv(value)).await.unwrap();
    }
    t.settle().await;

    let sent = t.transport.notifications();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].values, vec![pv(30.0)]);
    assert_eq!(t.store.reads() - reads_before, 1);
}

#[tokio::test]
async fn test_cancellation_is_acked_without_notification() {
    let t = TestNode::start();
    t.node.dispatch(peer(1), subscribe_pv(1, 60, false)).await.unwrap();
    t.settle().await;

    let response = t.node.dispatch(peer(1), subscribe_pv(2, 60, true)).await.unwrap();
    t.settle().await;

    assert!(matches!(response, Some(Response::SimpleAck { invoke_id: 2, .. })));
    assert_eq!(t.transport.notifications().len(), 1);
    assert!(t.registry.subscribers_for(av0()).is_empty());
}

#[tokio::test]
async fn test_write_without_subscribers_touches_no_transport() {
    let t = TestNode::start();

    t.store.write_property(av0(), pv(12.0)).await.unwrap();
    t.settle().await;

    assert_eq!(t.transport.calls(), 0);
    assert_eq!(t.store.reads(), 0);
}

#[tokio::test]
async fn test_failing_subscriber_is_dropped() {
    let t = TestNode::start();
    t.transport.set_peer(&peer(1), Peer::Fails);
    t.node.dispatch(peer(1), subscribe_pv(1, 60, false)).await.unwrap();
    t.node.dispatch(peer(2), subscribe_pv(1, 60, false)).await.unwrap();
    t.settle().await;
    // the initial notification failure alone does not remove anyone
    assert_eq!(t.registry.subscribers_for(av0()).len(), 2);

    t.store.write_property(av0(), pv(5.0)).await.unwrap();
    t.settle().await;

    let left: Vec<_> = t
        .registry
        .subscribers_for(av0())
        .into_iter()
        .map(|s| s.address)
        .collect();
    assert_eq!(left, vec![peer(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_silent_subscriber_is_dropped_after_its_lifetime() {
    let t = TestNode::start();
    t.node.dispatch(peer(2), subscribe_pv(1, 300, false)).await.unwrap();
    t.transport.set_peer(&peer(1), Peer::Silent);
    t.registry.subscribe(bacnode::SubscribeRequest {
        address: peer(1),
        invoke_id: 1,
        process_id: 1,
        object_id: av0(),
        property: PropertyId::PRESENT_VALUE.into(),
        cancellation: false,
        issue_confirmed: true,
        lifetime: 20,
        cov_increment: None,
    });

    let started = tokio::time::Instant::now();
    t.store.write_property(av0(), pv(6.0)).await.unwrap();
    t.settle().await;

    assert!(started.elapsed() >= Duration::from_secs(19));
    let left: Vec<_> = t
        .registry
        .subscribers_for(av0())
        .into_iter()
        .map(|s| s.address)
        .collect();
    assert_eq!(left, vec![peer(2)]);
}
