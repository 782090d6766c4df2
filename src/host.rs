use crate::field::FieldSchema;
use crate::form::FormSession;
use crate::functions::{self, FunctionContext, ServerlessResponse};
use crate::gateway::PropertyGateway;
use crate::store::{ObjectStore, PropertyMap};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Capabilities the CRM host grants the panel.
#[async_trait]
pub trait PanelHost: Send + Sync {
    async fn run_serverless_function(
        &self,
        name: &str,
        parameters: PropertyMap,
        properties_to_send: &[&str],
    ) -> ServerlessResponse;

    fn refresh_object_properties(&self);
}

/// Host bound to a single record that runs the serverless functions
/// in-process against its own gateway.
pub struct LocalHost<S> {
    gateway: PropertyGateway<S>,
    record_properties: PropertyMap,
    refreshes: AtomicUsize,
}

impl<S: ObjectStore> LocalHost<S> {
    pub fn new(gateway: PropertyGateway<S>, record_id: &str) -> Self {
        let mut record_properties = PropertyMap::new();
        record_properties.insert(
            functions::RECORD_ID_PROPERTY.to_string(),
            Value::String(record_id.to_string()),
        );
        Self {
            gateway,
            record_properties,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// A host with no record in view; functions needing a record id fail.
    pub fn detached(gateway: PropertyGateway<S>) -> Self {
        Self {
            gateway,
            record_properties: PropertyMap::new(),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn with_record_property(mut self, name: &str, value: Value) -> Self {
        self.record_properties.insert(name.to_string(), value);
        self
    }

    pub fn gateway(&self) -> &PropertyGateway<S> {
        &self.gateway
    }

    /// Starts a form session against the gateway's object type.
    pub fn open_session<'a>(&'a self, schema: &'a FieldSchema) -> FormSession<'a, Self> {
        FormSession::with_object_type(self, schema, self.gateway.object_type())
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: ObjectStore> PanelHost for LocalHost<S> {
    async fn run_serverless_function(
        &self,
        name: &str,
        parameters: PropertyMap,
        properties_to_send: &[&str],
    ) -> ServerlessResponse {
        let mut sent = PropertyMap::new();
        for property in properties_to_send {
            if let Some(value) = self.record_properties.get(*property) {
                sent.insert(property.to_string(), value.clone());
            }
        }
        let ctx = FunctionContext {
            parameters,
            properties_to_send: sent,
        };
        functions::run_function(&self.gateway, name, &ctx).await
    }

    fn refresh_object_properties(&self) {
        debug!("Refreshing object properties");
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}
