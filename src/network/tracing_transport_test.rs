use tracing_test::traced_test;

use super::*;
use crate::Address;
use crate::ConfirmedService;
use crate::ErrorCode;
use crate::ObjectId;
use crate::ObjectType;
use crate::PropertyId;
use crate::PropertyValue;
use crate::Value;

#[tokio::test]
#[traced_test]
async fn test_notify_logs_and_acknowledges() {
    let transport = TracingTransport::default();
    let notification = CovNotification {
        address: Address::local(vec![10]),
        process_id: 1,
        device_id: ObjectId::device(1234),
        monitored_object: ObjectId::new(ObjectType::ANALOG_VALUE, 0),
        time_remaining: 60,
        confirmed: true,
        values: vec![PropertyValue::new(PropertyId::PRESENT_VALUE, vec![Value::Real(42.0)])],
    };

    assert!(transport.notify(notification).await.unwrap());
    assert!(logs_contain("cov notification"));
}

#[tokio::test]
async fn test_send_response_never_fails() {
    let transport = TracingTransport::new(Address::local(vec![0xFF]));
    assert_eq!(transport.broadcast_address(), Address::local(vec![0xFF]));

    let response = Response::error(3, ConfirmedService::WriteProperty, ErrorCode::AccessDenied);
    assert!(transport.send_response(Address::local(vec![1]), response).await.is_ok());
}

#[test]
fn test_error_response_carries_class_of_code() {
    let response = Response::error(9, ConfirmedService::ReadProperty, ErrorCode::UnknownObject);
    assert_eq!(response.invoke_id(), Some(9));
    assert_eq!(response.error_code(), Some(ErrorCode::UnknownObject));
    match response {
        Response::Error { class, .. } => assert_eq!(class, ErrorCode::UnknownObject.class()),
        other => panic!("unexpected {other:?}"),
    }
}
