use crate::core::documents_to_nodes::DocumentsToNodesEnvironment;
use crate::domain::model::{
    Document, ImageField, LinkField, Node, NodeId, NormalizedImageField, NormalizedLinkField,
    NormalizedStructuredTextField, Span, StructuredTextBlock,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The node store of the site generator.
pub trait NodeEnvironment: Send + Sync {
    fn create_node(&self, node: Node) -> Result<()>;
    fn create_node_id(&self, input: &str) -> NodeId;
    fn create_content_digest(&self, input: &Value) -> String;
}

/// Turns a link into a URL. `None` means the link has no page of its own.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, link: &LinkField) -> Option<String>;
}

impl<F> LinkResolver for F
where
    F: Fn(&LinkField) -> Option<String> + Send + Sync,
{
    fn resolve(&self, link: &LinkField) -> Option<String> {
        self(link)
    }
}

/// Where a resolver or serializer is about to be used: the field key and raw
/// value being processed (absent for a document's own URL) and the owning
/// document.
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext<'a> {
    pub key: Option<&'a str>,
    pub value: Option<&'a Value>,
    pub node: &'a Document,
}

pub trait LinkResolverFactory: Send + Sync {
    fn link_resolver(&self, ctx: ResolverContext<'_>) -> Box<dyn LinkResolver + '_>;
}

/// An element handed to an [`HtmlSerializer`].
#[derive(Debug, Clone, Copy)]
pub enum HtmlElement<'a> {
    Block(&'a StructuredTextBlock),
    Span { span: &'a Span, text: &'a str },
}

impl HtmlElement<'_> {
    pub fn element_type(&self) -> &str {
        match self {
            HtmlElement::Block(block) => &block.block_type,
            HtmlElement::Span { span, .. } => &span.span_type,
        }
    }
}

/// Renders one structured text element. `children` is the already rendered
/// inner HTML. Returning `None` falls back to the default rendering.
pub trait HtmlSerializer: Send + Sync {
    fn serialize(&self, element: HtmlElement<'_>, children: &str) -> Option<String>;
}

impl<F> HtmlSerializer for F
where
    F: Fn(HtmlElement<'_>, &str) -> Option<String> + Send + Sync,
{
    fn serialize(&self, element: HtmlElement<'_>, children: &str) -> Option<String> {
        self(element, children)
    }
}

pub trait HtmlSerializerFactory: Send + Sync {
    fn html_serializer(&self, ctx: ResolverContext<'_>) -> Option<Box<dyn HtmlSerializer + '_>>;
}

/// Fetches a remote image and registers it as a file node.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        parent: &NodeId,
        nodes: &dyn NodeEnvironment,
    ) -> Result<NodeId>;
}

/// The four field normalizers the document walker delegates to.
#[async_trait]
pub trait FieldNormalizers: Send + Sync {
    async fn normalize_image(
        &self,
        api_id: &str,
        field: ImageField,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedImageField>;

    async fn normalize_link(
        &self,
        api_id: &str,
        field: LinkField,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedLinkField>;

    async fn normalize_slices(
        &self,
        api_id: &str,
        field: Vec<NodeId>,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<Vec<NodeId>>;

    async fn normalize_structured_text(
        &self,
        api_id: &str,
        field: Vec<StructuredTextBlock>,
        path: &[String],
        doc: &Document,
        env: &DocumentsToNodesEnvironment<'_>,
    ) -> Result<NormalizedStructuredTextField>;
}
