use crate::config::ImageContext;
use crate::core::documents_to_nodes::DocumentsToNodesEnvironment;
use crate::core::link::resolve_link;
use crate::core::structured_text::{as_html, as_text};
use crate::core::type_paths::child_path;
use crate::domain::model::{
    Document, ImageField, LinkField, NodeId, NormalizedImageField, NormalizedLinkField,
    NormalizedStructuredTextField, StructuredTextBlock,
};
use crate::domain::ports::{FieldNormalizers, ResolverContext};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The stock normalizers used by the node pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizers;

impl DefaultNormalizers {
    async fn local_file(
        &self,
        url: Option<&str>,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Option<NodeId> {
        let url = url.filter(|url| !url.is_empty())?;
        let downloader = env.image_downloader?;
        let parent = env.nodes.create_node_id(&doc.id);

        match downloader.download(url, &parent, env.nodes).await {
            Ok(file_id) => Some(file_id),
            Err(e) => {
                tracing::warn!("Image download failed for {} ({}): {}", path.join("."), url, e);
                None
            }
        }
    }
}

#[async_trait]
impl FieldNormalizers for DefaultNormalizers {
    async fn normalize_image(
        &self,
        api_id: &str,
        field: ImageField,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedImageField> {
        let (normalize, download) = {
            let ctx = ImageContext {
                key: api_id,
                path,
                node: doc,
                value: &field,
            };
            (
                env.options.should_normalize_image.allows(&ctx),
                env.options.should_download_image.allows(&ctx),
            )
        };

        if !normalize {
            tracing::debug!("Image normalization skipped for {}", path.join("."));
            return Ok(NormalizedImageField::passthrough(field));
        }

        let local_file = if download {
            self.local_file(field.url.as_deref(), path, doc, env).await
        } else {
            None
        };

        let (thumbnails, extra) = field.split_thumbnails();
        let mut normalized_thumbnails = BTreeMap::new();
        for (name, thumbnail) in thumbnails {
            let thumbnail_local_file = if download {
                let thumbnail_path = child_path(path, &name);
                self.local_file(thumbnail.url.as_deref(), &thumbnail_path, doc, env)
                    .await
            } else {
                None
            };

            let mut normalized = NormalizedImageField::passthrough(thumbnail);
            normalized.local_file = thumbnail_local_file;
            normalized_thumbnails.insert(name, normalized);
        }

        Ok(NormalizedImageField {
            alt: field.alt,
            copyright: field.copyright,
            dimensions: field.dimensions,
            url: field.url,
            thumbnails: normalized_thumbnails,
            extra,
            local_file,
        })
    }

    async fn normalize_link(
        &self,
        api_id: &str,
        field: LinkField,
        _path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedLinkField> {
        Ok(resolve_link(Some(api_id), field, doc, env))
    }

    async fn normalize_slices(
        &self,
        _api_id: &str,
        field: Vec<NodeId>,
        _path: &[String],
        _doc: &Document,
        _env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<Vec<NodeId>> {
        Ok(field)
    }

    async fn normalize_structured_text(
        &self,
        api_id: &str,
        field: Vec<StructuredTextBlock>,
        _path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedStructuredTextField> {
        let raw_value = serde_json::to_value(&field)?;
        let ctx = ResolverContext {
            key: Some(api_id),
            value: Some(&raw_value),
            node: doc,
        };

        let link_resolver = env.options.link_resolver.link_resolver(ctx);
        let serializer = env.options.html_serializer.html_serializer(ctx);

        let html = as_html(&field, link_resolver.as_ref(), serializer.as_deref());
        let text = as_text(&field);

        Ok(NormalizedStructuredTextField {
            html,
            text,
            raw: field,
        })
    }
}
