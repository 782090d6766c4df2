use crate::coerce::{split_multi_value, DateParts};
use crate::field::{FieldDescriptor, FieldOption, FieldSchema, FieldType};
use crate::functions::{
    ServerlessResponse, GET_CURRENT_VALUES, GET_PROPERTY, RECORD_ID_PROPERTY, UPDATE_PROPERTY,
};
use crate::host::PanelHost;
use crate::store::{PropertyMap, PropertyMetadata};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error, info};

pub const EMPTY_MESSAGE: &str = "No properties to display";

const RECORD_SCOPE: &[&str] = &[RECORD_ID_PROPERTY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Ready,
    Submitting,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "component")]
pub enum Control {
    Input {
        value: Value,
        placeholder: String,
    },
    Select {
        value: Value,
        options: Vec<FieldOption>,
        placeholder: String,
    },
    MultiSelect {
        value: Vec<String>,
        options: Vec<FieldOption>,
    },
    DateInput {
        value: DateParts,
        format: &'static str,
    },
    TextArea {
        value: Value,
        placeholder: String,
        resize: &'static str,
    },
    NumberInput {
        value: Value,
        placeholder: String,
    },
    ToggleGroup {
        value: Value,
        options: Vec<FieldOption>,
        #[serde(rename = "toggleType")]
        toggle_type: &'static str,
        inline: bool,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Widget {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub control: Control,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PanelView {
    pub widgets: Vec<Widget>,
    pub empty_message: Option<&'static str>,
    pub button_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub fetched: usize,
    pub failed: Vec<String>,
    pub values_loaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedWrite {
    pub property: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub attempted: usize,
    pub failed: Vec<FailedWrite>,
    pub refreshed: bool,
}

impl SubmitOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One mounted viewing session of the panel.
///
/// Metadata, current values and local edits live only as long as the
/// session; dropping it is the unmount.
pub struct FormSession<'a, H: PanelHost + ?Sized> {
    host: &'a H,
    schema: &'a FieldSchema,
    object_type: String,
    state: FormState,
    metadata: HashMap<String, PropertyMetadata>,
    current_values: PropertyMap,
    local_edits: PropertyMap,
}

impl<'a, H: PanelHost + ?Sized> FormSession<'a, H> {
    pub fn new(host: &'a H, schema: &'a FieldSchema) -> Self {
        Self::with_object_type(host, schema, crate::config::DEFAULT_OBJECT_TYPE)
    }

    pub fn with_object_type(host: &'a H, schema: &'a FieldSchema, object_type: &str) -> Self {
        Self {
            host,
            schema,
            object_type: object_type.to_string(),
            state: FormState::Loading,
            metadata: HashMap::new(),
            current_values: PropertyMap::new(),
            local_edits: PropertyMap::new(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn current_values(&self) -> &PropertyMap {
        &self.current_values
    }

    pub fn local_edits(&self) -> &PropertyMap {
        &self.local_edits
    }

    pub fn metadata(&self, field_id: &str) -> Option<&PropertyMetadata> {
        self.metadata.get(field_id)
    }

    /// Fetches every field's metadata and the record's current values
    /// concurrently. Each call settles on its own; failures only shrink the
    /// displayed set.
    pub async fn load(&mut self) -> LoadOutcome {
        self.state = FormState::Loading;
        let host = self.host;
        let schema = self.schema;
        let object_type = self.object_type.clone();

        let metadata_calls = schema.fields.iter().map(|field| {
            let mut parameters = PropertyMap::new();
            parameters.insert("objectType".to_string(), json!(object_type));
            parameters.insert("propertyName".to_string(), json!(field.id));
            async move {
                let response = host
                    .run_serverless_function(GET_PROPERTY, parameters, &[])
                    .await;
                (field.id.clone(), response)
            }
        });

        let mut value_params = PropertyMap::new();
        value_params.insert("propertyName".to_string(), json!(schema.field_ids()));
        let values_call =
            host.run_serverless_function(GET_CURRENT_VALUES, value_params, RECORD_SCOPE);

        let (metadata_responses, values_response) =
            futures::join!(join_all(metadata_calls), values_call);

        let mut failed = Vec::new();
        self.metadata.clear();
        for (field_id, response) in metadata_responses {
            match parse_metadata(&response) {
                Some(meta) => {
                    self.metadata.insert(field_id, meta);
                }
                None => {
                    error!(field = %field_id, response = %response.response, "Error fetching property details");
                    failed.push(field_id);
                }
            }
        }

        let values_loaded = match parse_current_values(&values_response) {
            Some(values) => {
                debug!(count = values.len(), "Property values loaded");
                self.current_values = values;
                true
            }
            None => {
                error!(response = %values_response.response, "Error fetching current values");
                false
            }
        };

        info!(
            fetched = self.metadata.len(),
            failed = failed.len(),
            "Property details loaded"
        );
        self.state = FormState::Ready;
        LoadOutcome {
            fetched: self.metadata.len(),
            failed,
            values_loaded,
        }
    }

    /// Fields whose metadata arrived, in schema order.
    pub fn displayed_fields(&self) -> Vec<(&FieldDescriptor, &PropertyMetadata)> {
        self.schema
            .fields
            .iter()
            .filter_map(|field| self.metadata.get(&field.id).map(|meta| (field, meta)))
            .collect()
    }

    fn merged_value(&self, name: &str) -> Option<&Value> {
        present(self.local_edits.get(name)).or_else(|| present(self.current_values.get(name)))
    }

    /// Local edit, else remote value, else an empty string.
    pub fn display_value(&self, name: &str) -> Value {
        self.merged_value(name)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn on_change(&mut self, name: &str, value: Value) {
        debug!(property = name, value = %value, "handleValueChange");
        self.local_edits.insert(name.to_string(), value);
    }

    pub fn dirty_fields(&self) -> Vec<String> {
        self.displayed_fields()
            .into_iter()
            .map(|(_, meta)| meta.name.clone())
            .filter(|name| self.local_edits.contains_key(name))
            .collect()
    }

    pub fn view(&self) -> PanelView {
        let widgets = self
            .displayed_fields()
            .into_iter()
            .filter_map(|(field, meta)| self.render_field(field, meta))
            .collect();
        PanelView {
            widgets,
            empty_message: self.metadata.is_empty().then_some(EMPTY_MESSAGE),
            button_text: self.schema.button_text.clone(),
        }
    }

    fn render_field(&self, field: &FieldDescriptor, meta: &PropertyMetadata) -> Option<Widget> {
        let type_name = meta
            .field_type
            .as_deref()
            .unwrap_or_else(|| field.field_type.as_str());
        let field_type = match type_name.parse::<FieldType>() {
            Ok(t) => t,
            Err(e) => {
                error!(property = %meta.name, error = %e, "Unsupported fieldType");
                return None;
            }
        };

        let name = meta.name.clone();
        let label = if meta.label.is_empty() {
            field.label.clone()
        } else {
            meta.label.clone()
        };
        let options = if meta.options.is_empty() {
            field.options.clone()
        } else {
            meta.options.clone()
        };

        let control = match field_type {
            FieldType::Text => Control::Input {
                value: self.display_value(&name),
                placeholder: format!("Enter new value for {}", label),
            },
            FieldType::Select => Control::Select {
                value: self.display_value(&name),
                options,
                placeholder: format!("Select a value for {}", label),
            },
            FieldType::Checkbox => Control::MultiSelect {
                value: split_multi_value(self.merged_value(&name)),
                options,
            },
            FieldType::Date => Control::DateInput {
                value: self.date_value(&name),
                format: "standard",
            },
            FieldType::Textarea => Control::TextArea {
                value: self.display_value(&name),
                placeholder: format!("Select a value for {}", label),
                resize: "vertical",
            },
            FieldType::Number => Control::NumberInput {
                value: self.display_value(&name),
                placeholder: format!("Enter new value for {}", label),
            },
            FieldType::Booleancheckbox => Control::ToggleGroup {
                value: self.display_value(&name),
                options,
                toggle_type: "radioButtonList",
                inline: true,
            },
        };

        Some(Widget {
            name,
            label,
            control,
        })
    }

    fn date_value(&self, name: &str) -> DateParts {
        [self.local_edits.get(name), self.current_values.get(name)]
            .into_iter()
            .flatten()
            .find_map(DateParts::from_value)
            .unwrap_or_else(DateParts::today)
    }

    /// Writes every displayed field back, edited or not, then asks the host
    /// to refresh if every write succeeded. Successful writes are never
    /// rolled back.
    ///
    /// A displayed field with neither an edit nor a stored value is sent as
    /// `null` and fails as a missing parameter, so one blank property is
    /// enough to suppress the refresh.
    pub async fn submit(&mut self) -> SubmitOutcome {
        self.state = FormState::Submitting;
        let host = self.host;

        let updates: Vec<(String, Value)> = self
            .displayed_fields()
            .into_iter()
            .map(|(_, meta)| {
                let value = self.merged_value(&meta.name).cloned().unwrap_or(Value::Null);
                (meta.name.clone(), value)
            })
            .collect();
        debug!(?updates, "Submitting property updates");
        let attempted = updates.len();

        let calls = updates.into_iter().map(|(property, new_value)| {
            let mut parameters = PropertyMap::new();
            parameters.insert("propertyName".to_string(), json!(property));
            parameters.insert("newValue".to_string(), new_value);
            async move {
                let response = host
                    .run_serverless_function(UPDATE_PROPERTY, parameters, RECORD_SCOPE)
                    .await;
                (property, response)
            }
        });

        let failed: Vec<FailedWrite> = join_all(calls)
            .await
            .into_iter()
            .filter(|(_, response)| !response.is_success())
            .map(|(property, response)| FailedWrite {
                property,
                response: response.response,
            })
            .collect();

        let refreshed = if failed.is_empty() {
            host.refresh_object_properties();
            true
        } else {
            for failure in &failed {
                error!(property = %failure.property, response = %failure.response, "Error updating properties");
            }
            false
        };

        self.state = FormState::Ready;
        SubmitOutcome {
            attempted,
            failed,
            refreshed,
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn parse_metadata(response: &ServerlessResponse) -> Option<PropertyMetadata> {
    if !response.is_success() {
        return None;
    }
    serde_json::from_value(response.response.clone()).ok()
}

fn parse_current_values(response: &ServerlessResponse) -> Option<PropertyMap> {
    if !response.is_success() {
        return None;
    }
    response
        .response
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
}
