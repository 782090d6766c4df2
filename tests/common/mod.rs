use anyhow::Result;
use company_panel_core::field::FieldSchema;
use company_panel_core::store::{MemoryStore, PropertyMap, PropertyMetadata};
use company_panel_core::{LocalHost, PropertyGateway};
use serde_json::Value;
use std::sync::Arc;

#[allow(dead_code)]
pub const RECORD_ID: &str = "9001";

#[allow(dead_code)]
pub const FIELDS_JSON: &str = include_str!("../../resources/fields.json");

#[allow(dead_code)]
pub fn sample_schema() -> Result<FieldSchema> {
    FieldSchema::from_json_str(FIELDS_JSON)
}

#[allow(dead_code)]
pub fn metadata_for(schema: &FieldSchema) -> Vec<PropertyMetadata> {
    schema
        .fields
        .iter()
        .map(|field| {
            let mut meta =
                PropertyMetadata::new(&field.id, &field.label, field.field_type.as_str());
            meta.options = field.options.clone();
            meta
        })
        .collect()
}

/// Memory store seeded with metadata for every sample field and one record.
#[allow(dead_code)]
pub fn setup_store(record: Value) -> Result<Arc<MemoryStore>> {
    let schema = sample_schema()?;
    let store = Arc::new(MemoryStore::new());
    for meta in metadata_for(&schema) {
        store.insert_property("companies", meta);
    }
    let properties: PropertyMap = match record {
        Value::Object(map) => map,
        _ => PropertyMap::new(),
    };
    store.insert_record("companies", RECORD_ID, properties);
    Ok(store)
}

#[allow(dead_code)]
pub fn setup_host(store: &Arc<MemoryStore>) -> LocalHost<Arc<MemoryStore>> {
    LocalHost::new(PropertyGateway::new(Arc::clone(store)), RECORD_ID)
}
