use crate::config::PluginOptions;
use crate::core::documents_to_nodes::{documents_to_nodes, DocumentsToNodesEnvironment};
use crate::core::environment::MemoryEnvironment;
use crate::core::normalizers::DefaultNormalizers;
use crate::core::type_paths::{type_paths_filename, type_paths_from_schemas, TypePathStore};
use crate::domain::model::{Document, Node, NodeId};
use crate::domain::ports::{FieldNormalizers, ImageDownloader, Storage};
use crate::utils::error::Result;
use serde_json::Value;

pub const NODES_FILENAME: &str = "nodes.json";

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub document_ids: Vec<NodeId>,
    pub node_count: usize,
    pub type_path_count: usize,
    pub type_paths_file: String,
}

/// Turns a batch of documents into nodes and writes them, together with the
/// type paths, to storage.
pub struct SourceEngine<S: Storage> {
    storage: S,
    options: PluginOptions,
    nodes: MemoryEnvironment,
    normalizers: Box<dyn FieldNormalizers>,
    type_paths: TypePathStore,
    image_downloader: Option<Box<dyn ImageDownloader>>,
}

impl<S: Storage> SourceEngine<S> {
    pub fn new(storage: S, options: PluginOptions) -> Self {
        let type_paths = TypePathStore::from_entries(type_paths_from_schemas(&options.schemas));
        Self {
            storage,
            nodes: MemoryEnvironment::new(&options.repository_name),
            normalizers: Box::new(DefaultNormalizers),
            type_paths,
            image_downloader: None,
            options,
        }
    }

    pub fn with_normalizers(mut self, normalizers: impl FieldNormalizers + 'static) -> Self {
        self.normalizers = Box::new(normalizers);
        self
    }

    pub fn with_image_downloader(mut self, downloader: impl ImageDownloader + 'static) -> Self {
        self.image_downloader = Some(Box::new(downloader));
        self
    }

    pub fn nodes(&self) -> &MemoryEnvironment {
        &self.nodes
    }

    pub fn type_paths(&self) -> &TypePathStore {
        &self.type_paths
    }

    pub async fn run(&self, documents: Vec<Document>) -> Result<SourceSummary> {
        tracing::info!(
            "Sourcing {} documents from {}",
            documents.len(),
            self.options.repository_name
        );

        let mut env = DocumentsToNodesEnvironment::new(
            &self.nodes,
            self.normalizers.as_ref(),
            &self.type_paths,
            &self.options,
        );
        if let Some(downloader) = &self.image_downloader {
            env = env.with_image_downloader(downloader.as_ref());
        }

        let document_ids = documents_to_nodes(documents, &env).await?;

        let nodes: Vec<Node> = self.nodes.nodes();
        let json = serde_json::to_vec_pretty(&nodes)?;
        self.storage.write_file(NODES_FILENAME, &json).await?;
        tracing::info!("Wrote {} nodes to {}", nodes.len(), NODES_FILENAME);

        let type_paths_file = type_paths_filename(
            &self.options.type_paths_filename_prefix,
            &self.options.schemas,
        );
        self.type_paths.persist(&self.storage, &type_paths_file).await?;
        tracing::info!(
            "Wrote {} type paths to {}",
            self.type_paths.len(),
            type_paths_file
        );

        Ok(SourceSummary {
            document_ids,
            node_count: nodes.len(),
            type_path_count: self.type_paths.len(),
            type_paths_file,
        })
    }
}

/// Accepts either a bare array of documents or an API search response with a
/// `results` array.
pub fn parse_documents(bytes: &[u8]) -> Result<Vec<Document>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let documents = match value {
        Value::Object(mut response) if response.contains_key("results") => response
            .remove("results")
            .unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    Ok(serde_json::from_value(documents)?)
}
