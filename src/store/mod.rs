pub mod hubspot;
pub mod memory;

use crate::field::FieldOption;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub use hubspot::HubSpotStore;
pub use memory::MemoryStore;

pub type PropertyMap = Map<String, Value>;

/// Remote description of one property. Keys the panel does not use are kept
/// in `extra` untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, rename = "fieldType", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertyMetadata {
    pub fn new(name: &str, label: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            property_type: None,
            field_type: Some(field_type.to_string()),
            options: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub id: String,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(thiserror::Error, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub status: Option<u16>,
    pub category: Option<String>,
    pub message: String,
    #[serde(rename = "correlationId")]
    pub correlation_id: Option<String>,
}

impl StoreError {
    pub fn new(status: Option<u16>, category: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            category: Some(category.to_string()),
            message: message.into(),
            correlation_id: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Some(404), "OBJECT_NOT_FOUND", message)
    }
}

/// The three calls the panel needs from the CRM object API.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_property_metadata(
        &self,
        object_type: &str,
        property_name: &str,
    ) -> Result<PropertyMetadata, StoreError>;

    async fn get_record_by_id(
        &self,
        object_type: &str,
        record_id: &str,
        property_names: &[String],
    ) -> Result<RecordSnapshot, StoreError>;

    async fn update_record_properties(
        &self,
        object_type: &str,
        record_id: &str,
        properties: PropertyMap,
    ) -> Result<RecordSnapshot, StoreError>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get_property_metadata(
        &self,
        object_type: &str,
        property_name: &str,
    ) -> Result<PropertyMetadata, StoreError> {
        (**self).get_property_metadata(object_type, property_name).await
    }

    async fn get_record_by_id(
        &self,
        object_type: &str,
        record_id: &str,
        property_names: &[String],
    ) -> Result<RecordSnapshot, StoreError> {
        (**self)
            .get_record_by_id(object_type, record_id, property_names)
            .await
    }

    async fn update_record_properties(
        &self,
        object_type: &str,
        record_id: &str,
        properties: PropertyMap,
    ) -> Result<RecordSnapshot, StoreError> {
        (**self)
            .update_record_properties(object_type, record_id, properties)
            .await
    }
}
