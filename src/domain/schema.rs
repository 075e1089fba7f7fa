//! Custom type schemas, as exported from the Prismic custom type editor.
//!
//! This is authoring-time metadata: it says which fields a document type has
//! and how they are configured, never what they contain.

use crate::domain::model::FieldType;
use crate::utils::error::{PrismicError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub type FieldSchemas = BTreeMap<String, FieldSchema>;

/// Tab name to the fields shown in that tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(pub BTreeMap<String, FieldSchemas>);

/// Custom type id to its schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schemas(pub BTreeMap<String, Schema>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseFieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labelledby: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Kind-specific settings such as select `options` or `useAsTitle`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseFieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(default)]
    pub config: BaseFieldConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConstraint {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSchema {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageFieldConfig {
    #[serde(flatten)]
    pub base: BaseFieldConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ImageConstraint>,
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageFieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(default)]
    pub config: ImageFieldConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupFieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub fields: FieldSchemas,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupFieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(default)]
    pub config: GroupFieldConfig,
}

/// One choice of a slice zone, with its repeatable and singleton fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default)]
    pub repeat: FieldSchemas,
    #[serde(rename = "non-repeat", default)]
    pub non_repeat: FieldSchemas,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlicesFieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Value>,
    #[serde(default)]
    pub choices: BTreeMap<String, SliceSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlicesFieldSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(default)]
    pub config: SlicesFieldConfig,
}

/// A field definition, tagged by its Prismic `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FieldSchema {
    Boolean(BaseFieldSchema),
    Color(BaseFieldSchema),
    Date(BaseFieldSchema),
    Embed(BaseFieldSchema),
    GeoPoint(BaseFieldSchema),
    Group(GroupFieldSchema),
    Image(ImageFieldSchema),
    Link(BaseFieldSchema),
    Number(BaseFieldSchema),
    Select(BaseFieldSchema),
    Slice(SliceSchema),
    Slices(SlicesFieldSchema),
    StructuredText(BaseFieldSchema),
    Text(BaseFieldSchema),
    Timestamp(BaseFieldSchema),
    #[serde(rename = "UID")]
    Uid(BaseFieldSchema),
}

impl FieldSchema {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldSchema::Boolean(_) => FieldType::Boolean,
            FieldSchema::Color(_) => FieldType::Color,
            FieldSchema::Date(_) => FieldType::Date,
            FieldSchema::Embed(_) => FieldType::Embed,
            FieldSchema::GeoPoint(_) => FieldType::GeoPoint,
            FieldSchema::Group(_) => FieldType::Group,
            FieldSchema::Image(_) => FieldType::Image,
            FieldSchema::Link(_) => FieldType::Link,
            FieldSchema::Number(_) => FieldType::Number,
            FieldSchema::Select(_) => FieldType::Select,
            FieldSchema::Slice(_) => FieldType::Slice,
            FieldSchema::Slices(_) => FieldType::Slices,
            FieldSchema::StructuredText(_) => FieldType::StructuredText,
            FieldSchema::Text(_) => FieldType::Text,
            FieldSchema::Timestamp(_) => FieldType::Timestamp,
            FieldSchema::Uid(_) => FieldType::Uid,
        }
    }

    /// Sub-field definitions of a group, if this is one.
    pub fn group_fields(&self) -> Option<&FieldSchemas> {
        match self {
            FieldSchema::Group(group) => Some(&group.config.fields),
            _ => None,
        }
    }

    /// The slice choice named `slice_type`, if this is a slice zone.
    pub fn slice_choice(&self, slice_type: &str) -> Option<&SliceSchema> {
        match self {
            FieldSchema::Slices(slices) => slices.config.choices.get(slice_type),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            FieldSchema::Group(group) => group.config.label.as_deref(),
            FieldSchema::Image(image) => image.config.base.label.as_deref(),
            FieldSchema::Slice(_) | FieldSchema::Slices(_) => None,
            FieldSchema::Boolean(base)
            | FieldSchema::Color(base)
            | FieldSchema::Date(base)
            | FieldSchema::Embed(base)
            | FieldSchema::GeoPoint(base)
            | FieldSchema::Link(base)
            | FieldSchema::Number(base)
            | FieldSchema::Select(base)
            | FieldSchema::StructuredText(base)
            | FieldSchema::Text(base)
            | FieldSchema::Timestamp(base)
            | FieldSchema::Uid(base) => base.config.label.as_deref(),
        }
    }
}

impl Schema {
    /// Looks a top-level field up across all tabs.
    pub fn field(&self, api_id: &str) -> Option<&FieldSchema> {
        self.0.values().find_map(|tab| tab.get(api_id))
    }

    /// All top-level fields, tab by tab.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSchema)> {
        self.0.values().flat_map(|tab| tab.iter())
    }
}

impl Schemas {
    pub fn get(&self, custom_type: &str) -> Option<&Schema> {
        self.0.get(custom_type)
    }

    pub fn insert(&mut self, custom_type: impl Into<String>, schema: Schema) {
        self.0.insert(custom_type.into(), schema);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Schema)> {
        self.0.iter()
    }

    /// Loads every `<custom_type>.json` file in `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut schemas = Schemas::default();

        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let Some(custom_type) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&path)?;
            let schema: Schema =
                serde_json::from_str(&content).map_err(|e| PrismicError::SchemaError {
                    message: format!("{}: {}", path.display(), e),
                })?;

            tracing::debug!("Loaded schema '{}' from {}", custom_type, path.display());
            schemas.insert(custom_type, schema);
        }

        Ok(schemas)
    }
}
