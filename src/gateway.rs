use crate::coerce::coerce_for_write;
use crate::config::{ClientConfig, DEFAULT_OBJECT_TYPE};
use crate::store::{ObjectStore, PropertyMap, PropertyMetadata, RecordSnapshot, StoreError};
use serde_json::Value;
use std::fmt;
use tracing::{error, info, instrument};

pub const LIFECYCLE_STAGE_PROPERTY: &str = "lifecyclestage";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Required parameter {0} is missing")]
    MissingParameter(&'static str),

    #[error("Remote store error: {0}")]
    RemoteError(#[from] StoreError),

    #[error("Unsupported fieldType: {0}")]
    UnsupportedFieldType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Clear,
    Set,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Clear => f.write_str("clear"),
            LifecyclePhase::Set => f.write_str("set"),
        }
    }
}

/// Failure of the two-step lifecycle write. When `phase` is `Set` the clear
/// already landed and the stage is left empty on the record.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Lifecycle stage {phase} step failed: {source}")]
pub struct LifecycleWriteError {
    pub phase: LifecyclePhase,
    #[source]
    pub source: GatewayError,
}

impl LifecycleWriteError {
    pub fn left_stage_empty(&self) -> bool {
        self.phase == LifecyclePhase::Set
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, GatewayError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GatewayError::MissingParameter(name)),
    }
}

fn required_value<'a>(
    value: Option<&'a Value>,
    name: &'static str,
) -> Result<&'a Value, GatewayError> {
    match value {
        None | Some(Value::Null) => Err(GatewayError::MissingParameter(name)),
        Some(Value::String(s)) if s.is_empty() => Err(GatewayError::MissingParameter(name)),
        Some(v) => Ok(v),
    }
}

/// Stateless property reads and writes against one object type. Each call
/// is a single remote request (two for the lifecycle reset) with no retry.
pub struct PropertyGateway<S> {
    store: S,
    object_type: String,
}

impl<S: ObjectStore> PropertyGateway<S> {
    pub fn new(store: S) -> Self {
        Self::with_object_type(store, DEFAULT_OBJECT_TYPE)
    }

    /// Targets the object type named by `config`; sessions opened through
    /// `LocalHost::open_session` inherit it.
    pub fn from_config(store: S, config: &ClientConfig) -> Self {
        Self::with_object_type(store, &config.object_type)
    }

    pub fn with_object_type(store: S, object_type: &str) -> Self {
        Self {
            store,
            object_type: object_type.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    #[instrument(skip(self))]
    pub async fn fetch_field_metadata(
        &self,
        object_type: Option<&str>,
        property_name: Option<&str>,
    ) -> Result<PropertyMetadata, GatewayError> {
        let object_type = required(object_type, "objectType")?;
        let property_name = required(property_name, "propertyName")?;

        self.store
            .get_property_metadata(object_type, property_name)
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching property details");
                GatewayError::from(e)
            })
    }

    #[instrument(skip(self))]
    pub async fn fetch_current_values(
        &self,
        record_id: Option<&str>,
        property_names: &[String],
    ) -> Result<RecordSnapshot, GatewayError> {
        let record_id = required(record_id, "hs_object_id")?;

        self.store
            .get_record_by_id(&self.object_type, record_id, property_names)
            .await
            .map_err(|e| {
                error!(error = %e, "Error fetching current property values");
                GatewayError::from(e)
            })
    }

    #[instrument(skip(self, new_value))]
    pub async fn write_property(
        &self,
        record_id: Option<&str>,
        property_name: Option<&str>,
        new_value: Option<&Value>,
    ) -> Result<RecordSnapshot, GatewayError> {
        let record_id = required(record_id, "hs_object_id")?;
        let property_name = required(property_name, "propertyName")?;
        let new_value = required_value(new_value, "newValue")?;

        let mut properties = PropertyMap::new();
        properties.insert(property_name.to_string(), coerce_for_write(new_value));

        self.store
            .update_record_properties(&self.object_type, record_id, properties)
            .await
            .map_err(|e| {
                error!(error = %e, "Error updating property");
                GatewayError::from(e)
            })
    }

    pub async fn clear_lifecycle_stage(&self, record_id: &str) -> Result<RecordSnapshot, GatewayError> {
        self.write_lifecycle_raw(record_id, "").await
    }

    pub async fn set_lifecycle_stage(
        &self,
        record_id: &str,
        stage: &str,
    ) -> Result<RecordSnapshot, GatewayError> {
        self.write_lifecycle_raw(record_id, stage).await
    }

    async fn write_lifecycle_raw(
        &self,
        record_id: &str,
        value: &str,
    ) -> Result<RecordSnapshot, GatewayError> {
        let mut properties = PropertyMap::new();
        properties.insert(
            LIFECYCLE_STAGE_PROPERTY.to_string(),
            Value::String(value.to_string()),
        );
        Ok(self
            .store
            .update_record_properties(&self.object_type, record_id, properties)
            .await?)
    }

    /// Clears `lifecyclestage` and then sets it to `stage`, since the store
    /// refuses moving back to an earlier or equal stage otherwise.
    ///
    /// The two writes are not atomic. If the second one fails or never runs,
    /// the record is left with an empty stage and the caller has to retry.
    #[instrument(skip(self))]
    pub async fn write_lifecycle_stage_with_reset(
        &self,
        record_id: Option<&str>,
        stage: Option<&str>,
    ) -> Result<RecordSnapshot, LifecycleWriteError> {
        let fail_clear = |source| LifecycleWriteError {
            phase: LifecyclePhase::Clear,
            source,
        };
        let record_id = required(record_id, "hs_object_id").map_err(fail_clear)?;
        let stage = required(stage, "stage").map_err(fail_clear)?;
        info!(record_id, stage, "Resetting lifecycle stage");

        self.clear_lifecycle_stage(record_id)
            .await
            .map_err(|source| {
                error!(error = %source, "Clearing lifecycle stage failed");
                fail_clear(source)
            })?;

        self.set_lifecycle_stage(record_id, stage)
            .await
            .map_err(|source| {
                error!(error = %source, "Lifecycle stage left empty, setting stage failed");
                LifecycleWriteError {
                    phase: LifecyclePhase::Set,
                    source,
                }
            })
    }
}
