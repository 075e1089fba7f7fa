use crate::utils::error::{PrismicError, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type NodeId = String;

/// Field values keyed by their API id, exactly as the Prismic API returns them.
pub type RawFieldMap = serde_json::Map<String, Value>;

pub type NormalizedFieldMap = BTreeMap<String, NormalizedField>;

/// A document as delivered by the Prismic REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub slugs: Vec<String>,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub alternate_languages: Vec<LinkField>,
    #[serde(default)]
    pub data: RawFieldMap,
}

/// A slice as embedded in a slice zone of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub slice_type: String,
    #[serde(default)]
    pub slice_label: Option<String>,
    #[serde(default)]
    pub items: Vec<RawFieldMap>,
    #[serde(default)]
    pub primary: RawFieldMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub span_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One block of a rich text / title field.
///
/// Image and embed blocks carry their payload (`url`, `alt`, `oembed`, ...)
/// as extra keys, which are kept untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredTextBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkType {
    #[default]
    Any,
    Document,
    Media,
    Web,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkField {
    #[serde(default)]
    pub link_type: LinkType,
    #[serde(rename = "isBroken", default, skip_serializing_if = "Option::is_none")]
    pub is_broken: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Linked document fields requested through `fetchLinks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Any other attribute the API attaches (`height`, `width` on media, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl LinkField {
    /// A document link pointing at `doc`, the shape link resolvers receive
    /// when resolving a document's own URL.
    pub fn from_document(doc: &Document) -> Self {
        LinkField {
            link_type: LinkType::Document,
            is_broken: Some(false),
            id: Some(doc.id.clone()),
            doc_type: Some(doc.doc_type.clone()),
            tags: Some(doc.tags.clone()),
            lang: Some(doc.lang.clone()),
            slug: doc.slugs.first().cloned(),
            uid: doc.uid.clone(),
            ..Default::default()
        }
    }

    pub fn is_broken(&self) -> bool {
        self.is_broken.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageField {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub url: Option<String>,
    /// Thumbnails and any other attribute (`edit`, ...) the API attaches.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ImageField {
    /// Splits `extra` into named thumbnails and the remaining attributes.
    ///
    /// A thumbnail is any nested object carrying `dimensions` or `url`.
    pub fn split_thumbnails(
        &self,
    ) -> (
        BTreeMap<String, ImageField>,
        serde_json::Map<String, Value>,
    ) {
        let mut thumbnails = BTreeMap::new();
        let mut rest = serde_json::Map::new();

        for (key, value) in &self.extra {
            let is_thumbnail = value
                .as_object()
                .map(|obj| obj.contains_key("dimensions") || obj.contains_key("url"))
                .unwrap_or(false);

            match is_thumbnail
                .then(|| serde_json::from_value::<ImageField>(value.clone()).ok())
                .flatten()
            {
                Some(thumbnail) => {
                    thumbnails.insert(key.clone(), thumbnail);
                }
                None => {
                    rest.insert(key.clone(), value.clone());
                }
            }
        }

        (thumbnails, rest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPointField {
    pub latitude: f64,
    pub longitude: f64,
}

/// A raw field value, classified by kind.
///
/// Group elements and slice bodies stay as raw maps so each level can be
/// classified against its own schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    StructuredText(Vec<StructuredTextBlock>),
    Image(ImageField),
    Slices(Vec<Slice>),
    Group(Vec<RawFieldMap>),
    Link(LinkField),
    AlternateLanguages(Vec<LinkField>),
    Embed(Value),
    GeoPoint(GeoPointField),
    Text(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Field {
    /// Classifies a raw JSON value.
    ///
    /// With a schema hint the value must match the declared kind; without one
    /// the kind is inferred from the value's shape.
    pub fn classify(value: Value, hint: Option<FieldType>) -> Result<Field> {
        if value.is_null() {
            return Ok(Field::Null);
        }

        let Some(hint) = hint else {
            return Ok(Self::classify_by_shape(value));
        };

        let field = match hint {
            FieldType::StructuredText => Field::StructuredText(serde_json::from_value(value)?),
            FieldType::Image => Field::Image(serde_json::from_value(value)?),
            FieldType::Slices => Field::Slices(serde_json::from_value(value)?),
            FieldType::Group => Field::Group(serde_json::from_value(value)?),
            FieldType::Link => Field::Link(serde_json::from_value(value)?),
            FieldType::AlternateLanguages => {
                Field::AlternateLanguages(serde_json::from_value(value)?)
            }
            // Unfilled geo points arrive as `{}`.
            FieldType::GeoPoint if !has_keys(&value, &["latitude", "longitude"]) => Field::Null,
            FieldType::GeoPoint => Field::GeoPoint(serde_json::from_value(value)?),
            FieldType::Embed | FieldType::Slice => Field::Embed(value),
            FieldType::Boolean => match value {
                Value::Bool(b) => Field::Boolean(b),
                other => return Err(mismatch(hint, &other)),
            },
            FieldType::Number => match value.as_f64() {
                Some(n) => Field::Number(n),
                None => return Err(mismatch(hint, &value)),
            },
            FieldType::Color
            | FieldType::Date
            | FieldType::Select
            | FieldType::Text
            | FieldType::Timestamp
            | FieldType::Uid => match value {
                Value::String(s) => Field::Text(s),
                other => return Err(mismatch(hint, &other)),
            },
        };

        Ok(field)
    }

    fn classify_by_shape(value: Value) -> Field {
        match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Boolean(b),
            Value::Number(n) => n.as_f64().map(Field::Number).unwrap_or(Field::Null),
            Value::String(s) => Field::Text(s),
            Value::Array(items) => {
                let all_have = |key: &str| {
                    !items.is_empty()
                        && items
                            .iter()
                            .all(|item| item.as_object().is_some_and(|o| o.contains_key(key)))
                };

                if all_have("slice_type") {
                    if let Ok(slices) = serde_json::from_value(Value::Array(items.clone())) {
                        return Field::Slices(slices);
                    }
                } else if all_have("type")
                    && items
                        .iter()
                        .any(|item| item.as_object().is_some_and(|o| o.contains_key("spans")))
                {
                    if let Ok(blocks) = serde_json::from_value(Value::Array(items.clone())) {
                        return Field::StructuredText(blocks);
                    }
                }

                let maps: Option<Vec<RawFieldMap>> = items
                    .iter()
                    .map(|item| item.as_object().cloned())
                    .collect();
                match maps {
                    Some(maps) => Field::Group(maps),
                    None => Field::Embed(Value::Array(items)),
                }
            }
            Value::Object(obj) => {
                if obj.contains_key("link_type") {
                    if let Ok(link) = serde_json::from_value(Value::Object(obj.clone())) {
                        return Field::Link(link);
                    }
                }
                if obj.contains_key("latitude") && obj.contains_key("longitude") {
                    if let Ok(point) = serde_json::from_value(Value::Object(obj.clone())) {
                        return Field::GeoPoint(point);
                    }
                }
                if obj.contains_key("dimensions")
                    || (obj.contains_key("url") && obj.contains_key("alt"))
                {
                    if let Ok(image) = serde_json::from_value(Value::Object(obj.clone())) {
                        return Field::Image(image);
                    }
                }
                Field::Embed(Value::Object(obj))
            }
        }
    }

    /// `None` for `Null`, whose kind is only known from the schema.
    pub fn kind(&self) -> Option<FieldType> {
        match self {
            Field::StructuredText(_) => Some(FieldType::StructuredText),
            Field::Image(_) => Some(FieldType::Image),
            Field::Slices(_) => Some(FieldType::Slices),
            Field::Group(_) => Some(FieldType::Group),
            Field::Link(_) => Some(FieldType::Link),
            Field::AlternateLanguages(_) => Some(FieldType::AlternateLanguages),
            Field::Embed(_) => Some(FieldType::Embed),
            Field::GeoPoint(_) => Some(FieldType::GeoPoint),
            Field::Text(_) => Some(FieldType::Text),
            Field::Number(_) => Some(FieldType::Number),
            Field::Boolean(_) => Some(FieldType::Boolean),
            Field::Null => None,
        }
    }
}

fn has_keys(value: &Value, keys: &[&str]) -> bool {
    value
        .as_object()
        .is_some_and(|obj| keys.iter().all(|key| obj.contains_key(*key)))
}

fn mismatch(expected: FieldType, value: &Value) -> PrismicError {
    PrismicError::SchemaError {
        message: format!("expected a {} field, got {}", expected, value),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedStructuredTextField {
    pub html: String,
    pub text: String,
    pub raw: Vec<StructuredTextBlock>,
}

/// A link with its URL resolved. Every attribute of the source link is kept,
/// plus an untouched copy in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedLinkField {
    pub link_type: LinkType,
    #[serde(rename = "isBroken")]
    pub is_broken: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
    /// Node id of the linked document, for unbroken document links.
    pub document: Option<NodeId>,
    pub raw: LinkField,
}

impl NormalizedLinkField {
    pub fn new(raw: LinkField, url: String, document: Option<NodeId>) -> Self {
        NormalizedLinkField {
            link_type: raw.link_type,
            is_broken: raw.is_broken(),
            url,
            target: raw.target.clone(),
            size: raw.size.clone(),
            id: raw.id.clone(),
            doc_type: raw.doc_type.clone(),
            tags: raw.tags.clone(),
            lang: raw.lang.clone(),
            slug: raw.slug.clone(),
            uid: raw.uid.clone(),
            name: raw.name.clone(),
            kind: raw.kind.clone(),
            data: raw.data.clone(),
            extra: raw.extra.clone(),
            document,
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedImageField {
    pub alt: Option<String>,
    pub copyright: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnails: BTreeMap<String, NormalizedImageField>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
    #[serde(rename = "localFile")]
    pub local_file: Option<NodeId>,
}

impl NormalizedImageField {
    /// Copies every attribute of `field`, leaving thumbnails in `extra`
    /// untouched and no local file.
    pub fn passthrough(field: ImageField) -> Self {
        NormalizedImageField {
            alt: field.alt,
            copyright: field.copyright,
            dimensions: field.dimensions,
            url: field.url,
            thumbnails: BTreeMap::new(),
            extra: field.extra,
            local_file: None,
        }
    }
}

/// One variant per [`Field`] variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedField {
    StructuredText(NormalizedStructuredTextField),
    Image(NormalizedImageField),
    Slices(Vec<NodeId>),
    Group(Vec<NormalizedFieldMap>),
    Link(NormalizedLinkField),
    AlternateLanguages(Vec<NormalizedLinkField>),
    Embed(Value),
    GeoPoint(GeoPointField),
    Text(String),
    Number(f64),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Color,
    Date,
    Embed,
    GeoPoint,
    Group,
    Image,
    Link,
    Number,
    Select,
    Slice,
    Slices,
    StructuredText,
    Text,
    Timestamp,
    #[serde(rename = "UID")]
    Uid,
    AlternateLanguages,
}

impl FieldType {
    pub fn graphql_type(self) -> GraphQLType {
        match self {
            FieldType::Color | FieldType::Select | FieldType::Text | FieldType::Uid => {
                GraphQLType::String
            }
            FieldType::Boolean => GraphQLType::Boolean,
            FieldType::Number => GraphQLType::Float,
            FieldType::Date | FieldType::Timestamp => GraphQLType::Date,
            FieldType::Embed => GraphQLType::Embed,
            FieldType::GeoPoint => GraphQLType::GeoPoint,
            FieldType::Image => GraphQLType::Image,
            FieldType::Link => GraphQLType::Link,
            FieldType::StructuredText => GraphQLType::StructuredText,
            FieldType::Group => GraphQLType::Group,
            FieldType::Slices => GraphQLType::Slices,
            FieldType::Slice => GraphQLType::Json,
            FieldType::AlternateLanguages => GraphQLType::AlternateLanguages,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Uid => f.write_str("UID"),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphQLType {
    #[serde(rename = "ID")]
    Id,
    Boolean,
    String,
    Float,
    Date,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "PrismicLinkType")]
    Link,
    #[serde(rename = "PrismicImageType")]
    Image,
    #[serde(rename = "PrismicImageThumbnailsType")]
    ImageThumbnails,
    #[serde(rename = "PrismicImageThumbnailType")]
    ImageThumbnail,
    #[serde(rename = "PrismicEmbedType")]
    Embed,
    #[serde(rename = "PrismicGeoPointType")]
    GeoPoint,
    #[serde(rename = "PrismicStructuredTextType")]
    StructuredText,
    #[serde(rename = "PrismicAllDocumentTypes")]
    AllDocumentTypes,
    Group,
    Slices,
    AlternateLanguages,
}

impl GraphQLType {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphQLType::Id => "ID",
            GraphQLType::Boolean => "Boolean",
            GraphQLType::String => "String",
            GraphQLType::Float => "Float",
            GraphQLType::Date => "Date",
            GraphQLType::Json => "JSON",
            GraphQLType::Link => "PrismicLinkType",
            GraphQLType::Image => "PrismicImageType",
            GraphQLType::ImageThumbnails => "PrismicImageThumbnailsType",
            GraphQLType::ImageThumbnail => "PrismicImageThumbnailType",
            GraphQLType::Embed => "PrismicEmbedType",
            GraphQLType::GeoPoint => "PrismicGeoPointType",
            GraphQLType::StructuredText => "PrismicStructuredTextType",
            GraphQLType::AllDocumentTypes => "PrismicAllDocumentTypes",
            GraphQLType::Group => "Group",
            GraphQLType::Slices => "Slices",
            GraphQLType::AlternateLanguages => "AlternateLanguages",
        }
    }
}

impl fmt::Display for GraphQLType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a field inside a custom type, and the type it was inferred as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePath {
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypePath {
    pub fn new(path: Vec<String>, type_name: impl Into<String>) -> Self {
        TypePath {
            path,
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInternal {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "contentDigest")]
    pub content_digest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentNode {
    pub id: NodeId,
    #[serde(rename = "prismicId")]
    pub prismic_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub uid: Option<String>,
    pub href: Option<String>,
    pub lang: String,
    pub tags: Vec<String>,
    #[serde(with = "prismic_date")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(with = "prismic_date")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub data: NormalizedFieldMap,
    #[serde(rename = "dataString")]
    pub data_string: String,
    #[serde(rename = "dataRaw")]
    pub data_raw: RawFieldMap,
    pub alternate_languages: Vec<NormalizedLinkField>,
    pub url: Option<String>,
    pub internal: NodeInternal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceNode {
    pub id: NodeId,
    pub slice_type: String,
    pub slice_label: Option<String>,
    pub items: Vec<NormalizedFieldMap>,
    pub primary: NormalizedFieldMap,
    pub internal: NodeInternal,
}

/// A remote asset fetched to local storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileNode {
    pub id: NodeId,
    pub parent: NodeId,
    pub url: String,
    pub name: String,
    pub extension: String,
    #[serde(rename = "mediaType")]
    pub media_type: Option<String>,
    pub size: u64,
    pub path: String,
    pub internal: NodeInternal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Document(Box<DocumentNode>),
    Slice(SliceNode),
    File(FileNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Document(node) => &node.id,
            Node::Slice(node) => &node.id,
            Node::File(node) => &node.id,
        }
    }

    pub fn internal(&self) -> &NodeInternal {
        match self {
            Node::Document(node) => &node.internal,
            Node::Slice(node) => &node.internal,
            Node::File(node) => &node.internal,
        }
    }
}

/// Parses Prismic timestamps, which use `+0000` style offsets.
pub fn parse_prismic_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(input))
        .ok()
}

mod prismic_date {
    use chrono::{DateTime, FixedOffset};
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}
