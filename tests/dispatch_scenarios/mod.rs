use bacnode::ErrorCode;
use bacnode::ObjectId;
use bacnode::ObjectType;
use bacnode::PropertyId;
use bacnode::ReadAccessSpecification;
use bacnode::Request;
use bacnode::Response;
use bacnode::Value;

use crate::common::ai0;
use crate::common::av0;
use crate::common::peer;
use crate::common::TestNode;

#[tokio::test]
async fn test_read_multiple_reports_each_entry_in_place() {
    let t = TestNode::start();
    let missing = ObjectId::new(ObjectType::ANALOG_OUTPUT, 3);
    let specs = vec![
        ReadAccessSpecification {
            object_id: av0(),
            properties: vec![PropertyId::PRESENT_VALUE.into()],
        },
        ReadAccessSpecification {
            object_id: missing,
            properties: vec![PropertyId::PRESENT_VALUE.into()],
        },
        ReadAccessSpecification {
            object_id: ai0(),
            properties: vec![PropertyId::OBJECT_NAME.into()],
        },
    ];

    let response = t
        .node
        .dispatch(peer(1), Request::ReadPropertyMultiple { invoke_id: 9, specs })
        .await
        .unwrap();

    let Some(Response::ReadPropertyMultiple { results, .. }) = response else {
        panic!("expected a read-multiple ack");
    };
    let objects: Vec<_> = results.iter().map(|r| r.object_id).collect();
    assert_eq!(objects, vec![av0(), missing, ai0()]);
    assert_eq!(results[0].results.as_ref().unwrap()[0].value, Ok(vec![Value::Real(1.0)]));
    assert_eq!(results[1].results, Err(ErrorCode::UnknownObject));
    assert_eq!(
        results[2].results.as_ref().unwrap()[0].value,
        Ok(vec![Value::CharacterString("Sine".into())])
    );
}

#[tokio::test]
async fn test_every_confirmed_request_gets_exactly_one_response() {
    let t = TestNode::start();
    let requests = vec![
        Request::ReadProperty {
            invoke_id: 1,
            object_id: av0(),
            property: PropertyId::PRESENT_VALUE.into(),
        },
        Request::ReadProperty {
            invoke_id: 2,
            object_id: ObjectId::new(ObjectType::ANALOG_VALUE, 50),
            property: PropertyId::PRESENT_VALUE.into(),
        },
        Request::WriteProperty {
            invoke_id: 3,
            object_id: av0(),
            value: bacnode::PropertyValue::new(PropertyId::PRESENT_VALUE, vec![Value::Real(500.0)]),
        },
        Request::SubscribeCov {
            invoke_id: 4,
            process_id: 1,
            object_id: ObjectId::new(ObjectType::ANALOG_VALUE, 50),
            property: None,
            cancellation: false,
            issue_confirmed: false,
            lifetime: 0,
            cov_increment: None,
        },
    ];

    let handles: Vec<_> = requests.into_iter().map(|r| t.node.dispatch(peer(1), r)).collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    let mut invoke_ids: Vec<_> = t
        .transport
        .responses()
        .iter()
        .filter_map(|(_, r)| r.invoke_id())
        .collect();
    invoke_ids.sort();
    assert_eq!(invoke_ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_who_is_is_answered_with_i_am() {
    let t = TestNode::start();

    let response = t
        .node
        .dispatch(peer(1), Request::WhoIs { low_limit: Some(0), high_limit: Some(4_194_302) })
        .await
        .unwrap();

    match response {
        Some(Response::IAm { device_id, broadcast, .. }) => {
            assert_eq!(device_id, t.node.dispatcher().device_id());
            assert!(!broadcast);
        }
        other => panic!("unexpected {other:?}"),
    }
}
