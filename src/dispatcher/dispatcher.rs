use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::AddressBindings;
use super::Request;
use crate::constants::DEFAULT_WRITE_PRIORITY;
use crate::metrics::REQUESTS_TOTAL;
use crate::metrics::REQUEST_DURATION_MS;
use crate::metrics::REQUEST_ERRORS_TOTAL;
use crate::Address;
use crate::ConfirmedService;
use crate::CovCoordinator;
use crate::DeviceConfig;
use crate::Error;
use crate::ErrorCode;
use crate::ObjectId;
use crate::ObjectLocks;
use crate::ObjectStore;
use crate::PropertyId;
use crate::PropertyReference;
use crate::PropertyResult;
use crate::PropertyValue;
use crate::ReadAccessResult;
use crate::ReadAccessSpecification;
use crate::Response;
use crate::Result;
use crate::ServiceSupported;
use crate::SubscribeRequest;
use crate::Subscription;
use crate::SubscriptionRegistry;
use crate::Transport;

/// Services answered by [`Dispatcher`], as published in the device
/// object's services-supported bitmap.
pub const SUPPORTED_SERVICES: [ServiceSupported; 9] = [
    ServiceSupported::WhoIs,
    ServiceSupported::IAm,
    ServiceSupported::ReadProperty,
    ServiceSupported::ReadPropertyMultiple,
    ServiceSupported::WriteProperty,
    ServiceSupported::SubscribeCov,
    ServiceSupported::SubscribeCovProperty,
    ServiceSupported::ConfirmedCovNotification,
    ServiceSupported::UnconfirmedCovNotification,
];

/// Routes decoded requests to their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn SubscriptionRegistry>,
    transport: Arc<dyn Transport>,
    locks: Arc<ObjectLocks>,
    coordinator: CovCoordinator,
    device: DeviceConfig,
    bindings: AddressBindings,
}

/// Outcome of a handler, sent once the handler has returned.
struct Reply {
    to: Address,
    response: Option<Response>,
    /// Subscription that gets its first notification once the ack is out
    initial: Option<Subscription>,
}

impl Reply {
    fn respond(
        to: Address,
        response: Response,
    ) -> Self {
        Self {
            to,
            response: Some(response),
            initial: None,
        }
    }

    fn silence(to: Address) -> Self {
        Self {
            to,
            response: None,
            initial: None,
        }
    }
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Arc<dyn Transport>,
        locks: Arc<ObjectLocks>,
        coordinator: CovCoordinator,
        device: DeviceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                store,
                registry,
                transport,
                locks,
                coordinator,
                device,
                bindings: AddressBindings::new(),
            }),
        }
    }

    /// Handles `request` from `from` on a task of its own.
    ///
    /// The handle resolves to the response that was sent, `None` when the
    /// request is answered with silence.
    pub fn dispatch(
        &self,
        from: Address,
        request: Request,
    ) -> JoinHandle<Option<Response>> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.handle(from, request).await })
    }

    pub fn services_supported(&self) -> Vec<ServiceSupported> {
        SUPPORTED_SERVICES.to_vec()
    }

    pub fn bindings(&self) -> &AddressBindings {
        &self.inner.bindings
    }

    pub fn device_id(&self) -> ObjectId {
        ObjectId::device(self.inner.device.device_id)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("device_id", &self.inner.device.device_id)
            .finish()
    }
}

impl DispatcherInner {
    async fn handle(
        self: Arc<Self>,
        from: Address,
        request: Request,
    ) -> Option<Response> {
        let service = request.service_name();
        let confirmed = request.confirmed_service().zip(request.invoke_id());
        let started = Instant::now();
        REQUESTS_TOTAL.with_label_values(&[service]).inc();

        let reply = match AssertUnwindSafe(self.process(from.clone(), request))
            .catch_unwind()
            .await
        {
            Ok(reply) => reply,
            Err(_) => {
                error!(%from, service, "request handler panicked");
                match confirmed {
                    Some((confirmed_service, invoke_id)) => Reply::respond(
                        from,
                        Response::error(invoke_id, confirmed_service, ErrorCode::Other),
                    ),
                    None => Reply::silence(from),
                }
            }
        };

        if let Some(response) = &reply.response {
            if let Some(code) = response.error_code() {
                REQUEST_ERRORS_TOTAL.with_label_values(&[service, code.as_str()]).inc();
            }
            if let Err(e) = self.transport.send_response(reply.to.clone(), response.clone()).await {
                warn!(to = %reply.to, service, "failed to send response: {:?}", e);
            }
        }

        if let Some(subscription) = &reply.initial {
            if let Err(e) = self.coordinator.send_initial_notification(subscription).await {
                warn!(
                    address = %subscription.address,
                    object = %subscription.monitored_object,
                    "initial cov notification failed: {:?}",
                    e
                );
            }
        }

        REQUEST_DURATION_MS
            .with_label_values(&[service])
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        reply.response
    }

    async fn process(
        &self,
        from: Address,
        request: Request,
    ) -> Reply {
        match request {
            Request::ReadProperty {
                invoke_id,
                object_id,
                property,
            } => Reply::respond(from, self.read_property(invoke_id, object_id, property).await),
            Request::ReadPropertyMultiple { invoke_id, specs } => {
                Reply::respond(from, self.read_property_multiple(invoke_id, specs).await)
            }
            Request::WriteProperty {
                invoke_id,
                object_id,
                value,
            } => Reply::respond(from, self.write_property(invoke_id, object_id, value).await),
            Request::SubscribeCov {
                invoke_id,
                process_id,
                object_id,
                property,
                cancellation,
                issue_confirmed,
                lifetime,
                cov_increment,
            } => {
                let service = match property {
                    None => ConfirmedService::SubscribeCov,
                    Some(_) => ConfirmedService::SubscribeCovProperty,
                };
                let request = SubscribeRequest {
                    address: from.clone(),
                    invoke_id,
                    process_id,
                    object_id,
                    property: property.unwrap_or(PropertyReference::new(PropertyId::ALL)),
                    cancellation,
                    issue_confirmed,
                    lifetime,
                    cov_increment,
                };
                self.subscribe_cov(service, request).await
            }
            Request::WhoIs { low_limit, high_limit } => self.who_is(from, low_limit, high_limit),
            Request::IAm {
                device_id,
                max_apdu,
                segmentation,
                vendor_id,
            } => {
                self.bindings
                    .record(device_id, from.clone(), max_apdu, segmentation, vendor_id);
                Reply::silence(from)
            }
        }
    }

    /// `Ok(None)` when the object does not exist.
    async fn resolve(
        &self,
        object_id: ObjectId,
    ) -> Result<Option<ObjectId>> {
        self.store.find_object(object_id).await
    }

    async fn read_property(
        &self,
        invoke_id: u8,
        object_id: ObjectId,
        property: PropertyReference,
    ) -> Response {
        let service = ConfirmedService::ReadProperty;
        match self.resolve(object_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Response::error(invoke_id, service, ErrorCode::UnknownObject),
            Err(e) => return fault(invoke_id, service, e),
        }

        let result = {
            let _guard = self.locks.lock(object_id).await;
            self.store.read_property(object_id, property).await
        };

        match result {
            Ok(values) => Response::ReadProperty {
                invoke_id,
                object_id,
                property,
                values,
            },
            Err(e) => {
                debug!(%object_id, %property, "read refused: {}", e);
                Response::error(invoke_id, service, e.error_code())
            }
        }
    }

    async fn read_property_multiple(
        &self,
        invoke_id: u8,
        specs: Vec<ReadAccessSpecification>,
    ) -> Response {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.read_access(spec).await {
                Ok(result) => results.push(result),
                Err(e) => return fault(invoke_id, ConfirmedService::ReadPropertyMultiple, e),
            }
        }
        Response::ReadPropertyMultiple { invoke_id, results }
    }

    /// Resolves one read access specification. A lone `ALL` reads the
    /// whole object. Access refusals become error entries; any other
    /// failure aborts the whole request.
    async fn read_access(
        &self,
        spec: ReadAccessSpecification,
    ) -> Result<ReadAccessResult> {
        let object_id = spec.object_id;
        if self.resolve(object_id).await?.is_none() {
            return Ok(ReadAccessResult {
                object_id,
                results: Err(ErrorCode::UnknownObject),
            });
        }

        let _guard = self.locks.lock(object_id).await;
        if let [only] = spec.properties.as_slice() {
            if only.property_id.is_all() {
                let results = match self.store.read_all_properties(object_id).await {
                    Ok(values) => Ok(values
                        .into_iter()
                        .map(|v| PropertyResult {
                            property: v.property,
                            value: Ok(v.values),
                        })
                        .collect()),
                    Err(e) if e.is_access() => Err(e.error_code()),
                    Err(e) => return Err(e),
                };
                return Ok(ReadAccessResult { object_id, results });
            }
        }

        // ALL next to named properties is read like any other reference
        let mut results = Vec::with_capacity(spec.properties.len());
        for property in spec.properties {
            let value = match self.store.read_property(object_id, property).await {
                Ok(values) => Ok(values),
                Err(e) if e.is_access() => Err(e.error_code()),
                Err(e) => return Err(e),
            };
            results.push(PropertyResult { property, value });
        }

        Ok(ReadAccessResult {
            object_id,
            results: Ok(results),
        })
    }

    async fn write_property(
        &self,
        invoke_id: u8,
        object_id: ObjectId,
        mut value: PropertyValue,
    ) -> Response {
        let service = ConfirmedService::WriteProperty;
        match self.resolve(object_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Response::error(invoke_id, service, ErrorCode::UnknownObject),
            Err(e) => return fault(invoke_id, service, e),
        }

        let priority = *value.priority.get_or_insert(DEFAULT_WRITE_PRIORITY);
        if !(1..=16).contains(&priority) {
            return Response::error(invoke_id, service, ErrorCode::OutOfRange);
        }

        let property = value.property;
        let result = {
            let _guard = self.locks.lock(object_id).await;
            self.store.write_property(object_id, value).await
        };

        match result {
            Ok(()) => Response::SimpleAck { invoke_id, service },
            Err(e) => {
                debug!(%object_id, %property, "write refused: {}", e);
                let code = match e.error_code() {
                    code @ (ErrorCode::AccessDenied | ErrorCode::OutOfRange) => code,
                    _ => ErrorCode::Other,
                };
                Response::error(invoke_id, service, code)
            }
        }
    }

    async fn subscribe_cov(
        &self,
        service: ConfirmedService,
        request: SubscribeRequest,
    ) -> Reply {
        let from = request.address.clone();
        let invoke_id = request.invoke_id;
        match self.resolve(request.object_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Reply::respond(from, Response::error(invoke_id, service, ErrorCode::SubscriptionFailed));
            }
            Err(e) => return Reply::respond(from, fault(invoke_id, service, e)),
        }

        let initial = self.registry.subscribe(request);
        Reply {
            to: from,
            response: Some(Response::SimpleAck { invoke_id, service }),
            initial,
        }
    }

    fn who_is(
        &self,
        from: Address,
        low_limit: Option<u32>,
        high_limit: Option<u32>,
    ) -> Reply {
        let instance = self.device.device_id;
        let in_range = low_limit.map_or(true, |low| instance >= low) && high_limit.map_or(true, |high| instance <= high);
        if !in_range {
            return Reply::silence(from);
        }

        let broadcast_address = self.transport.broadcast_address();
        let broadcast = from == broadcast_address;
        let to = if broadcast { broadcast_address } else { from };
        Reply::respond(
            to,
            Response::IAm {
                device_id: ObjectId::device(instance),
                max_apdu: self.device.max_apdu,
                segmentation: self.device.segmentation,
                vendor_id: self.device.vendor_id,
                broadcast,
            },
        )
    }
}

fn fault(
    invoke_id: u8,
    service: ConfirmedService,
    e: Error,
) -> Response {
    error!(?service, "request aborted by a store fault: {:?}", e);
    Response::error(invoke_id, service, ErrorCode::Other)
}
