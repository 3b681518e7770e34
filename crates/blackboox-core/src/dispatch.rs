//! Host-side service dispatch.
//!
//! A [`Dispatcher`] routes `(service, method, args)` calls to the service
//! objects it was built with. Sources are resolved once, in
//! [`DispatcherBuilder::build`]: objects are used as-is and factories are
//! invoked. Nothing is re-inspected per call.
//!
//! [`ServiceChannel`] puts a dispatcher behind an mpsc channel the way the
//! privileged bridge does: every call runs in its own task, and a failing or
//! panicking call only ever rejects itself.

use crate::error::DispatchError;
use blackboox_proto::{codes, ServiceCall, ServiceReply};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Future returned by a service method.
pub type MethodFuture = BoxFuture<'static, Result<Value, String>>;

type Method = Arc<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

/// Named async methods over positional JSON arguments.
#[derive(Clone, Default)]
pub struct ServiceObject {
    methods: HashMap<String, Method>,
}

impl ServiceObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method. A method returning `Err(message)` rejects the call.
    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.methods
            .insert(name.into(), Arc::new(move |args| f(args).boxed()));
        self
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Method names, sorted.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ServiceObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceObject")
            .field("methods", &self.method_names())
            .finish()
    }
}

/// How a service value is obtained.
pub enum ServiceSource {
    /// Used as-is.
    Object(ServiceObject),
    /// Invoked once when the dispatcher is built.
    Factory(Box<dyn FnOnce() -> ServiceObject + Send>),
}

impl ServiceSource {
    fn resolve(self) -> ServiceObject {
        match self {
            Self::Object(object) => object,
            Self::Factory(make) => make(),
        }
    }
}

/// Collects service sources in registration order.
#[derive(Default)]
pub struct DispatcherBuilder {
    sources: Vec<(String, ServiceSource)>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, name: impl Into<String>, source: ServiceSource) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    pub fn object(self, name: impl Into<String>, object: ServiceObject) -> Self {
        self.service(name, ServiceSource::Object(object))
    }

    pub fn factory<F>(self, name: impl Into<String>, make: F) -> Self
    where
        F: FnOnce() -> ServiceObject + Send + 'static,
    {
        self.service(name, ServiceSource::Factory(Box::new(make)))
    }

    /// Resolve every source. A later source with the same name replaces the earlier one.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let mut services = HashMap::with_capacity(self.sources.len());
        for (name, source) in self.sources {
            if services.insert(name.clone(), source.resolve()).is_some() {
                warn!(service = %name, "service registered twice, keeping the later one");
            }
        }
        Dispatcher {
            services: Arc::new(services),
        }
    }
}

/// Routes calls to resolved services. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    services: Arc<HashMap<String, ServiceObject>>,
}

impl Dispatcher {
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Service names, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up the service, then the method, then run it.
    pub async fn dispatch(&self, call: ServiceCall) -> Result<Value, DispatchError> {
        let ServiceCall {
            service,
            method,
            args,
        } = call;

        let Some(object) = self.services.get(&service) else {
            return Err(DispatchError::ServiceNotFound { service });
        };
        let Some(handler) = object.methods.get(&method).cloned() else {
            return Err(DispatchError::MethodNotFound { service, method });
        };

        debug!(service = %service, method = %method, args = args.len(), "dispatching");
        handler(args)
            .await
            .map_err(|message| DispatchError::Failed {
                service,
                method,
                message,
            })
    }

    /// [`Dispatcher::dispatch`] with the result encoded as a wire reply.
    pub async fn handle(&self, call: ServiceCall) -> ServiceReply {
        let target = call.target();
        match self.dispatch(call).await {
            Ok(value) => ServiceReply::ok(value),
            Err(e) => {
                warn!(call = %target, code = e.code(), error = %e, "service call rejected");
                ServiceReply::err(e.code(), e.to_string())
            }
        }
    }
}

/// Rejection of a proxied call as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    fn closed() -> Self {
        Self {
            code: codes::CHANNEL_CLOSED.to_string(),
            message: "service channel closed".to_string(),
        }
    }

    fn aborted(target: &str) -> Self {
        Self {
            code: codes::SERVICE_FAILED.to_string(),
            message: format!("{target} aborted before replying"),
        }
    }
}

struct Request {
    call: ServiceCall,
    reply: oneshot::Sender<ServiceReply>,
}

/// Host end of the service channel.
pub struct ServiceChannel;

impl ServiceChannel {
    /// Default request queue depth.
    pub const CAPACITY: usize = 64;

    /// Serve `dispatcher` on a background task. Must be called inside a tokio runtime.
    ///
    /// The task ends once every [`ServiceClient`] is dropped.
    #[must_use]
    pub fn spawn(dispatcher: Dispatcher) -> ServiceClient {
        Self::spawn_with_capacity(dispatcher, Self::CAPACITY)
    }

    #[must_use]
    pub fn spawn_with_capacity(dispatcher: Dispatcher, capacity: usize) -> ServiceClient {
        let (tx, mut rx) = mpsc::channel::<Request>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(Request { call, reply }) = rx.recv().await {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let result = dispatcher.handle(call).await;
                    // Caller gone; nothing to deliver
                    let _ = reply.send(result);
                });
            }
            debug!("service channel closed");
        });
        ServiceClient { tx }
    }
}

/// UI end of the service channel: the one forwarding method of the bridge.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    tx: mpsc::Sender<Request>,
}

impl ServiceClient {
    /// Forward `(service, method, ...args)` and wait for the host's reply.
    pub async fn call(
        &self,
        service: impl Into<String>,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Value, RemoteError> {
        let call = ServiceCall::new(service, method, args);
        let target = call.target();
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { call, reply })
            .await
            .map_err(|_| RemoteError::closed())?;

        match rx.await {
            Ok(ServiceReply::Ok { value }) => Ok(value),
            Ok(ServiceReply::Err { code, message }) => Err(RemoteError { code, message }),
            Err(_) => Err(RemoteError::aborted(&target)),
        }
    }

    /// Accessor for one service, mirroring the generated `auth()` proxies.
    #[must_use]
    pub fn service(&self, name: impl Into<String>) -> ServiceHandle {
        ServiceHandle {
            client: self.clone(),
            name: name.into(),
        }
    }
}

/// A capability object for one service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    client: ServiceClient,
    name: String,
}

impl ServiceHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, method: impl Into<String>, args: Vec<Value>) -> Result<Value, RemoteError> {
        self.client.call(self.name.clone(), method, args).await
    }
}
