use crate::gateway::PropertyGateway;
use crate::store::{ObjectStore, PropertyMap};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

pub const GET_PROPERTY: &str = "getProperty";
pub const GET_CURRENT_VALUES: &str = "getCurrentValues";
pub const UPDATE_PROPERTY: &str = "updateProperty";
pub const UPDATE_LIFECYCLE_STAGE: &str = "updateLifecycleStage";

pub const RECORD_ID_PROPERTY: &str = "hs_object_id";

/// Per-call input handed over by the host.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FunctionContext {
    #[serde(default)]
    pub parameters: PropertyMap,
    #[serde(default, rename = "propertiesToSend")]
    pub properties_to_send: PropertyMap,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerlessStatus {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerlessResponse {
    pub status: ServerlessStatus,
    pub response: Value,
}

impl ServerlessResponse {
    pub fn success(response: Value) -> Self {
        Self {
            status: ServerlessStatus::Success,
            response,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ServerlessStatus::Error,
            response: serde_json::json!({ "message": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ServerlessStatus::Success
    }
}

// --- Helpers ---

fn string_param(map: &PropertyMap, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list_param(map: &PropertyMap, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn record_id(ctx: &FunctionContext) -> Option<String> {
    string_param(&ctx.properties_to_send, RECORD_ID_PROPERTY)
}

// --- Functions ---

pub async fn get_property<S: ObjectStore>(
    gateway: &PropertyGateway<S>,
    ctx: &FunctionContext,
) -> Result<Value> {
    let object_type = string_param(&ctx.parameters, "objectType");
    let property_name = string_param(&ctx.parameters, "propertyName");
    let meta = gateway
        .fetch_field_metadata(object_type.as_deref(), property_name.as_deref())
        .await?;
    Ok(serde_json::to_value(meta)?)
}

pub async fn get_current_values<S: ObjectStore>(
    gateway: &PropertyGateway<S>,
    ctx: &FunctionContext,
) -> Result<Value> {
    let property_names = string_list_param(&ctx.parameters, "propertyName");
    let record_id = record_id(ctx);
    let record = gateway
        .fetch_current_values(record_id.as_deref(), &property_names)
        .await?;
    Ok(serde_json::to_value(record)?)
}

pub async fn update_property<S: ObjectStore>(
    gateway: &PropertyGateway<S>,
    ctx: &FunctionContext,
) -> Result<Value> {
    let property_name = string_param(&ctx.parameters, "propertyName");
    let record_id = record_id(ctx);
    let record = gateway
        .write_property(
            record_id.as_deref(),
            property_name.as_deref(),
            ctx.parameters.get("newValue"),
        )
        .await?;
    Ok(serde_json::to_value(record)?)
}

pub async fn update_lifecycle_stage<S: ObjectStore>(
    gateway: &PropertyGateway<S>,
    ctx: &FunctionContext,
) -> Result<Value> {
    let stage = string_param(&ctx.parameters, "stage");
    let record_id = record_id(ctx);
    info!(
        new_value = stage.as_deref().unwrap_or_default(),
        record_id = record_id.as_deref().unwrap_or_default(),
        "Updating lifecycle stage"
    );
    let record = gateway
        .write_lifecycle_stage_with_reset(record_id.as_deref(), stage.as_deref())
        .await?;
    Ok(serde_json::to_value(record)?)
}

/// Runs the named function and folds its outcome into the host's
/// `{status, response}` envelope. Failures are logged here and never raised.
pub async fn run_function<S: ObjectStore>(
    gateway: &PropertyGateway<S>,
    name: &str,
    ctx: &FunctionContext,
) -> ServerlessResponse {
    let result = match name {
        GET_PROPERTY => get_property(gateway, ctx).await,
        GET_CURRENT_VALUES => get_current_values(gateway, ctx).await,
        UPDATE_PROPERTY => update_property(gateway, ctx).await,
        UPDATE_LIFECYCLE_STAGE => update_lifecycle_stage(gateway, ctx).await,
        other => Err(anyhow!("Unknown serverless function: {}", other)),
    };

    match result {
        Ok(response) => ServerlessResponse::success(response),
        Err(e) => {
            error!(function = name, error = %e, "Serverless function failed");
            ServerlessResponse::error(e.to_string())
        }
    }
}
