use crate::core::documents_to_nodes::DocumentsToNodesEnvironment;
use crate::domain::model::{Document, LinkField, LinkType, NormalizedLinkField};
use crate::domain::ports::{LinkResolver, LinkResolverFactory, ResolverContext};
use serde_json::Value;

/// Resolves nothing: document links get an empty URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLinkResolverFactory;

impl LinkResolverFactory for EmptyLinkResolverFactory {
    fn link_resolver(&self, _ctx: ResolverContext<'_>) -> Box<dyn LinkResolver + '_> {
        Box::new(|_: &LinkField| -> Option<String> { None })
    }
}

/// Resolves document links to `<base_path>[<lang>/]<type>/<uid or id>`.
#[derive(Debug, Clone)]
pub struct PathLinkResolver {
    base_path: String,
    include_lang: bool,
}

impl PathLinkResolver {
    pub fn new(base_path: impl Into<String>, include_lang: bool) -> Self {
        let mut base_path = base_path.into();
        if !base_path.ends_with('/') {
            base_path.push('/');
        }
        Self {
            base_path,
            include_lang,
        }
    }
}

impl LinkResolver for PathLinkResolver {
    fn resolve(&self, link: &LinkField) -> Option<String> {
        if link.link_type != LinkType::Document {
            return None;
        }

        let doc_type = link.doc_type.as_deref()?;
        let slug = link.uid.as_deref().or(link.id.as_deref())?;

        let mut url = self.base_path.clone();
        if self.include_lang {
            if let Some(lang) = link.lang.as_deref().filter(|lang| !lang.is_empty()) {
                url.push_str(lang);
                url.push('/');
            }
        }
        url.push_str(doc_type);
        url.push('/');
        url.push_str(slug);
        Some(url)
    }
}

#[derive(Debug, Clone)]
pub struct PathLinkResolverFactory {
    resolver: PathLinkResolver,
}

impl PathLinkResolverFactory {
    pub fn new(base_path: impl Into<String>, include_lang: bool) -> Self {
        Self {
            resolver: PathLinkResolver::new(base_path, include_lang),
        }
    }
}

impl LinkResolverFactory for PathLinkResolverFactory {
    fn link_resolver(&self, _ctx: ResolverContext<'_>) -> Box<dyn LinkResolver + '_> {
        Box::new(self.resolver.clone())
    }
}

/// The URL a link points at: the resolver's answer for document links, the
/// stored URL for web and media links, and an empty string otherwise.
pub fn link_url(link: &LinkField, resolver: &dyn LinkResolver) -> String {
    match link.link_type {
        LinkType::Document if link.is_broken() => String::new(),
        LinkType::Document => resolver.resolve(link).unwrap_or_default(),
        LinkType::Web | LinkType::Media => link.url.clone().unwrap_or_default(),
        LinkType::Any => String::new(),
    }
}

/// Resolves `link` in the context of field `key` of `doc`.
pub fn resolve_link(
    key: Option<&str>,
    link: LinkField,
    doc: &Document,
    env: &DocumentsToNodesEnvironment<'_>,
) -> NormalizedLinkField {
    let raw_value = serde_json::to_value(&link).unwrap_or(Value::Null);
    let resolver = env.options.link_resolver.link_resolver(ResolverContext {
        key,
        value: Some(&raw_value),
        node: doc,
    });

    let url = link_url(&link, resolver.as_ref());
    let document = match (link.link_type, link.is_broken(), link.id.as_deref()) {
        (LinkType::Document, false, Some(id)) => Some(env.nodes.create_node_id(id)),
        _ => None,
    };

    NormalizedLinkField::new(link, url, document)
}

/// The resolved URL of a document itself.
pub fn document_url(doc: &Document, env: &DocumentsToNodesEnvironment<'_>) -> Option<String> {
    let resolver = env.options.link_resolver.link_resolver(ResolverContext {
        key: None,
        value: None,
        node: doc,
    });
    resolver.resolve(&LinkField::from_document(doc))
}
