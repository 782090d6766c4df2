use crate::gateway::GatewayError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Select,
    Checkbox,
    Date,
    Textarea,
    Number,
    Booleancheckbox,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Booleancheckbox => "booleancheckbox",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "select" => Ok(FieldType::Select),
            "checkbox" => Ok(FieldType::Checkbox),
            "date" => Ok(FieldType::Date),
            "textarea" => Ok(FieldType::Textarea),
            "number" => Ok(FieldType::Number),
            "booleancheckbox" => Ok(FieldType::Booleancheckbox),
            other => Err(GatewayError::UnsupportedFieldType(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldOption {
    pub label: String,
    pub value: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    #[serde(rename = "fieldType")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

/// The static list of editable fields plus the submit button label.
///
/// Loaded once at startup and never reloaded; field order is the order the
/// panel renders in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub fields: Vec<FieldDescriptor>,
    pub button_text: String,
}

impl FieldSchema {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let schema: FieldSchema =
            serde_json::from_str(content).context("Invalid field schema JSON")?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let schema: FieldSchema =
            serde_yaml::from_str(content).context("Invalid field schema YAML")?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Field schema {} not readable", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(anyhow!(
                "Unsupported field schema format: {}",
                other.unwrap_or("<none>")
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.id.trim().is_empty() {
                return Err(anyhow!("Field with label '{}' has an empty id", field.label));
            }
            if !seen.insert(field.id.as_str()) {
                return Err(anyhow!("Duplicate field id '{}'", field.id));
            }
        }
        Ok(())
    }

    pub fn field_ids(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }
}

pub fn list_field_types() -> Vec<String> {
    vec![
        "text".to_string(),
        "select".to_string(),
        "checkbox".to_string(),
        "date".to_string(),
        "textarea".to_string(),
        "number".to_string(),
        "booleancheckbox".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_round_trips_through_wire_string() {
        for name in list_field_types() {
            let parsed: FieldType = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn unknown_field_type_is_unsupported() {
        let err = "radio".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, GatewayError::UnsupportedFieldType(ref t) if t == "radio"));
    }
}
