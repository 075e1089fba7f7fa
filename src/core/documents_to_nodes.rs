use crate::config::PluginOptions;
use crate::core::link::document_url;
use crate::core::type_paths::{
    child_path, generated_type_name, section_type_name, type_name_for, TypePathStore,
};
use crate::domain::model::{
    parse_prismic_timestamp, Document, DocumentNode, Field, FieldType, LinkType,
    Node, NodeId, NodeInternal, NormalizedField, NormalizedFieldMap, RawFieldMap, Slice,
    SliceNode, TypePath,
};
use crate::domain::ports::{FieldNormalizers, ImageDownloader, NodeEnvironment};
use crate::domain::schema::{FieldSchema, FieldSchemas};
use crate::utils::error::{PrismicError, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Everything a normalizer may touch while a document is turned into nodes.
pub struct DocumentsToNodesEnvironment<'a> {
    pub nodes: &'a dyn NodeEnvironment,
    pub normalizers: &'a dyn FieldNormalizers,
    pub type_paths: &'a TypePathStore,
    pub options: &'a PluginOptions,
    pub image_downloader: Option<&'a dyn ImageDownloader>,
}

impl<'a> DocumentsToNodesEnvironment<'a> {
    pub fn new(
        nodes: &'a dyn NodeEnvironment,
        normalizers: &'a dyn FieldNormalizers,
        type_paths: &'a TypePathStore,
        options: &'a PluginOptions,
    ) -> Self {
        Self {
            nodes,
            normalizers,
            type_paths,
            options,
            image_downloader: None,
        }
    }

    pub fn with_image_downloader(mut self, downloader: &'a dyn ImageDownloader) -> Self {
        self.image_downloader = Some(downloader);
        self
    }
}

/// Normalizes `documents` in order, skipping those outside the configured
/// locale, and returns the ids of the created document nodes.
pub async fn documents_to_nodes(
    documents: Vec<Document>,
    env: &DocumentsToNodesEnvironment<'_>,
) -> Result<Vec<NodeId>> {
    let total = documents.len();
    let mut ids = Vec::with_capacity(total);

    for doc in documents {
        if !env.options.accepts_lang(&doc.lang) {
            tracing::debug!("Skipping document {} in locale {}", doc.id, doc.lang);
            continue;
        }
        ids.push(document_to_node(doc, env).await?);
    }

    tracing::info!("Created {} document nodes from {} documents", ids.len(), total);
    Ok(ids)
}

pub async fn document_to_node(
    doc: Document,
    env: &DocumentsToNodesEnvironment<'_>,
) -> Result<NodeId> {
    tracing::debug!("Normalizing document {} ({})", doc.id, doc.doc_type);

    let schema = env.options.schemas.get(&doc.doc_type);
    if schema.is_none() && !env.options.schemas.is_empty() {
        tracing::warn!(
            "No schema for custom type '{}', inferring field kinds",
            doc.doc_type
        );
    }

    let root = vec![doc.doc_type.clone()];
    let node_type = generated_type_name(&root);
    env.type_paths.push(TypePath::new(root.clone(), node_type.clone()));

    let data_path = child_path(&root, "data");
    let mut data = NormalizedFieldMap::new();
    for (api_id, value) in &doc.data {
        let field_schema = schema.and_then(|s| s.field(api_id));
        let normalized = normalize_field(
            api_id,
            value.clone(),
            child_path(&data_path, api_id),
            field_schema,
            &doc,
            env,
        )
        .await?;
        data.insert(api_id.clone(), normalized);
    }

    let alternates = serde_json::to_value(&doc.alternate_languages)?;
    let alternates_path = child_path(&root, "alternate_languages");
    let alternate_languages = match normalize_typed_field(
        "alternate_languages",
        alternates,
        alternates_path.clone(),
        Some(FieldType::AlternateLanguages),
        None,
        &doc,
        env,
    )
    .await?
    {
        NormalizedField::AlternateLanguages(links) => links,
        NormalizedField::Null => Vec::new(),
        _ => {
            return Err(PrismicError::normalization(
                &alternates_path,
                "expected a list of alternate language links",
            ))
        }
    };

    let id = env.nodes.create_node_id(&doc.id);
    let url = document_url(&doc, env);
    let data_string = serde_json::to_string(&doc.data)?;
    let content_digest = env.nodes.create_content_digest(&serde_json::to_value(&doc)?);

    let Document {
        id: prismic_id,
        uid,
        doc_type,
        href,
        tags,
        first_publication_date,
        last_publication_date,
        lang,
        data: data_raw,
        ..
    } = doc;

    let node = DocumentNode {
        id: id.clone(),
        prismic_id,
        doc_type,
        uid,
        href,
        lang,
        tags,
        first_publication_date: first_publication_date
            .as_deref()
            .and_then(parse_prismic_timestamp),
        last_publication_date: last_publication_date
            .as_deref()
            .and_then(parse_prismic_timestamp),
        data,
        data_string,
        data_raw,
        alternate_languages,
        url,
        internal: NodeInternal {
            node_type,
            content_digest,
        },
    };

    env.nodes.create_node(Node::Document(Box::new(node)))?;
    Ok(id)
}

type FieldFuture<'a> = Pin<Box<dyn Future<Output = Result<NormalizedField>> + Send + 'a>>;

/// Classifies and normalizes one field, recursing into groups and slices.
pub fn normalize_field<'a>(
    api_id: &'a str,
    value: Value,
    path: Vec<String>,
    schema: Option<&'a FieldSchema>,
    doc: &'a Document,
    env: &'a DocumentsToNodesEnvironment<'a>,
) -> FieldFuture<'a> {
    let hint = schema.map(FieldSchema::field_type);
    normalize_typed_field(api_id, value, path, hint, schema, doc, env)
}

fn normalize_typed_field<'a>(
    api_id: &'a str,
    value: Value,
    path: Vec<String>,
    hint: Option<FieldType>,
    schema: Option<&'a FieldSchema>,
    doc: &'a Document,
    env: &'a DocumentsToNodesEnvironment<'a>,
) -> FieldFuture<'a> {
    Box::pin(async move {
        let field = Field::classify(value, hint)
            .map_err(|e| PrismicError::normalization(&path, e.to_string()))?;

        if let Some(kind) = hint.or_else(|| field.kind()) {
            env.type_paths
                .push(TypePath::new(path.clone(), type_name_for(&path, kind)));
        }

        let normalizers = env.normalizers;
        let normalized = match field {
            Field::StructuredText(blocks) => NormalizedField::StructuredText(
                normalizers
                    .normalize_structured_text(api_id, blocks, &path, doc, env)
                    .await?,
            ),
            Field::Image(image) => NormalizedField::Image(
                normalizers
                    .normalize_image(api_id, image, &path, doc, env)
                    .await?,
            ),
            Field::Link(link) => NormalizedField::Link(
                normalizers
                    .normalize_link(api_id, link, &path, doc, env)
                    .await?,
            ),
            Field::AlternateLanguages(links) => {
                let mut out = Vec::with_capacity(links.len());
                for link in links {
                    // Entries carry no link_type but always point at documents.
                    let raw = link.clone();
                    let mut target = link;
                    if target.link_type == LinkType::Any {
                        target.link_type = LinkType::Document;
                    }
                    let mut normalized = normalizers
                        .normalize_link(api_id, target, &path, doc, env)
                        .await?;
                    normalized.raw = raw;
                    out.push(normalized);
                }
                NormalizedField::AlternateLanguages(out)
            }
            Field::Group(items) => {
                let fields = schema.and_then(FieldSchema::group_fields);
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(normalize_field_map(item, &path, fields, false, doc, env).await?);
                }
                NormalizedField::Group(out)
            }
            Field::Slices(slices) => {
                let mut ids = Vec::with_capacity(slices.len());
                for (index, slice) in slices.into_iter().enumerate() {
                    ids.push(slice_to_node(slice, index, &path, schema, doc, env).await?);
                }
                NormalizedField::Slices(
                    normalizers
                        .normalize_slices(api_id, ids, &path, doc, env)
                        .await?,
                )
            }
            Field::Embed(value) => NormalizedField::Embed(value),
            Field::GeoPoint(point) => NormalizedField::GeoPoint(point),
            Field::Text(text) => NormalizedField::Text(text),
            Field::Number(n) => NormalizedField::Number(n),
            Field::Boolean(b) => NormalizedField::Boolean(b),
            Field::Null => NormalizedField::Null,
        };

        Ok(normalized)
    })
}

/// Normalizes every entry of `map`. With `strict`, keys the schema does not
/// declare are dropped.
async fn normalize_field_map<'a>(
    map: RawFieldMap,
    path: &[String],
    schemas: Option<&'a FieldSchemas>,
    strict: bool,
    doc: &'a Document,
    env: &'a DocumentsToNodesEnvironment<'a>,
) -> Result<NormalizedFieldMap> {
    let mut out = NormalizedFieldMap::new();

    for (key, value) in map {
        let field_schema = schemas.and_then(|fields| fields.get(&key));
        if strict && schemas.is_some() && field_schema.is_none() {
            tracing::warn!(
                "Dropping field '{}' at {}: not declared in the schema",
                key,
                path.join(".")
            );
            continue;
        }

        let field_path = child_path(path, &key);
        let normalized = normalize_field(&key, value, field_path, field_schema, doc, env).await?;
        out.insert(key, normalized);
    }

    Ok(out)
}

async fn slice_to_node<'a>(
    slice: Slice,
    index: usize,
    slices_path: &[String],
    slices_schema: Option<&'a FieldSchema>,
    doc: &'a Document,
    env: &'a DocumentsToNodesEnvironment<'a>,
) -> Result<NodeId> {
    let slice_path = child_path(slices_path, &slice.slice_type);
    let choice = slices_schema.and_then(|s| s.slice_choice(&slice.slice_type));
    if slices_schema.is_some() && choice.is_none() {
        tracing::warn!(
            "Slice type '{}' is not declared at {}, keeping all of its fields",
            slice.slice_type,
            slices_path.join(".")
        );
    }

    let node_type = type_name_for(&slice_path, FieldType::Slice);
    env.type_paths
        .push(TypePath::new(slice_path.clone(), node_type.clone()));

    let primary_path = child_path(&slice_path, "primary");
    let items_path = child_path(&slice_path, "items");
    env.type_paths.push(TypePath::new(
        primary_path.clone(),
        section_type_name(&slice_path, "primary"),
    ));
    env.type_paths.push(TypePath::new(
        items_path.clone(),
        section_type_name(&slice_path, "items"),
    ));

    let content_digest = env
        .nodes
        .create_content_digest(&serde_json::to_value(&slice)?);
    let id = env
        .nodes
        .create_node_id(&format!("{} {} {}", doc.id, slices_path.join("_"), index));

    let Slice {
        slice_type,
        slice_label,
        items: raw_items,
        primary: raw_primary,
    } = slice;

    let primary = normalize_field_map(
        raw_primary,
        &primary_path,
        choice.map(|c| &c.non_repeat),
        choice.is_some(),
        doc,
        env,
    )
    .await?;

    let mut items = Vec::with_capacity(raw_items.len());
    for item in raw_items {
        items.push(
            normalize_field_map(
                item,
                &items_path,
                choice.map(|c| &c.repeat),
                choice.is_some(),
                doc,
                env,
            )
            .await?,
        );
    }

    env.nodes.create_node(Node::Slice(SliceNode {
        id: id.clone(),
        slice_type,
        slice_label,
        items,
        primary,
        internal: NodeInternal {
            node_type,
            content_digest,
        },
    }))?;

    Ok(id)
}
