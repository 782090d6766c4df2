use super::{ObjectStore, PropertyMap, PropertyMetadata, RecordSnapshot, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub object_type: String,
    pub record_id: String,
    pub properties: PropertyMap,
}

#[derive(Default)]
struct MemoryState {
    properties: HashMap<(String, String), PropertyMetadata>,
    records: HashMap<(String, String), PropertyMap>,
    failing_metadata: HashSet<String>,
    failing_writes: HashSet<String>,
    failing_values: Vec<(String, Value)>,
    updates: Vec<UpdateCall>,
    requests: usize,
}

/// In-process object store. Every call is counted and every update is
/// recorded in arrival order.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_property(&self, object_type: &str, metadata: PropertyMetadata) {
        self.state()
            .properties
            .insert((object_type.to_string(), metadata.name.clone()), metadata);
    }

    pub fn insert_record(&self, object_type: &str, record_id: &str, properties: PropertyMap) {
        self.state()
            .records
            .insert((object_type.to_string(), record_id.to_string()), properties);
    }

    /// Metadata lookups for `property_name` fail with a server error.
    pub fn fail_metadata_for(&self, property_name: &str) {
        self.state()
            .failing_metadata
            .insert(property_name.to_string());
    }

    /// Updates touching `property_name` are rejected as invalid.
    pub fn fail_writes_for(&self, property_name: &str) {
        self.state().failing_writes.insert(property_name.to_string());
    }

    /// Updates setting `property_name` to exactly `value` are rejected.
    pub fn fail_writes_with(&self, property_name: &str, value: Value) {
        self.state()
            .failing_values
            .push((property_name.to_string(), value));
    }

    pub fn record(&self, object_type: &str, record_id: &str) -> Option<PropertyMap> {
        self.state()
            .records
            .get(&(object_type.to_string(), record_id.to_string()))
            .cloned()
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.state().updates.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests
    }
}

fn snapshot(record_id: &str, properties: PropertyMap) -> RecordSnapshot {
    RecordSnapshot {
        id: record_id.to_string(),
        properties,
        extra: Default::default(),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_property_metadata(
        &self,
        object_type: &str,
        property_name: &str,
    ) -> Result<PropertyMetadata, StoreError> {
        let mut state = self.state();
        state.requests += 1;
        if state.failing_metadata.contains(property_name) {
            return Err(StoreError::new(
                Some(500),
                "INTERNAL_ERROR",
                format!("Metadata lookup failed for {}", property_name),
            ));
        }
        state
            .properties
            .get(&(object_type.to_string(), property_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(format!(
                    "Property {} does not exist on {}",
                    property_name, object_type
                ))
            })
    }

    async fn get_record_by_id(
        &self,
        object_type: &str,
        record_id: &str,
        property_names: &[String],
    ) -> Result<RecordSnapshot, StoreError> {
        let mut state = self.state();
        state.requests += 1;
        let record = state
            .records
            .get(&(object_type.to_string(), record_id.to_string()))
            .ok_or_else(|| StoreError::not_found(format!("Object {} not found", record_id)))?;

        let mut properties = PropertyMap::new();
        properties.insert("hs_object_id".to_string(), Value::String(record_id.to_string()));
        for name in property_names {
            let value = record.get(name).cloned().unwrap_or(Value::Null);
            properties.insert(name.clone(), value);
        }
        Ok(snapshot(record_id, properties))
    }

    async fn update_record_properties(
        &self,
        object_type: &str,
        record_id: &str,
        properties: PropertyMap,
    ) -> Result<RecordSnapshot, StoreError> {
        let mut state = self.state();
        state.requests += 1;
        state.updates.push(UpdateCall {
            object_type: object_type.to_string(),
            record_id: record_id.to_string(),
            properties: properties.clone(),
        });

        let rejected = properties.iter().find(|(name, value)| {
            state.failing_writes.contains(name.as_str())
                || state
                    .failing_values
                    .iter()
                    .any(|(prop, bad)| prop == *name && bad == *value)
        });
        if let Some((name, _)) = rejected {
            return Err(StoreError::new(
                Some(400),
                "VALIDATION_ERROR",
                format!("Property values were not valid: {}", name),
            ));
        }

        let record = state
            .records
            .get_mut(&(object_type.to_string(), record_id.to_string()))
            .ok_or_else(|| StoreError::not_found(format!("Object {} not found", record_id)))?;
        for (name, value) in properties {
            record.insert(name, value);
        }
        let merged = record.clone();
        Ok(snapshot(record_id, merged))
    }
}
