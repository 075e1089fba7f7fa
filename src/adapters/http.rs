use crate::domain::model::{FileNode, Node, NodeId, NodeInternal};
use crate::domain::ports::{ImageDownloader, NodeEnvironment, Storage};
use crate::utils::error::{PrismicError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

/// Downloads remote images into `storage` under `directory` and registers a
/// `File` node for each one.
pub struct HttpImageDownloader<S: Storage> {
    storage: S,
    client: Client,
    directory: String,
}

impl<S: Storage> HttpImageDownloader<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            client: Client::new(),
            directory: "images".to_string(),
        }
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// File name and extension from the last path segment of `url`.
fn file_name(url: &Url) -> (String, String) {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("file");

    match segment.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() => (name.to_string(), ext.to_lowercase()),
        _ => (segment.to_string(), String::new()),
    }
}

#[async_trait]
impl<S: Storage> ImageDownloader for HttpImageDownloader<S> {
    async fn download(
        &self,
        url: &str,
        parent: &NodeId,
        nodes: &dyn NodeEnvironment,
    ) -> Result<NodeId> {
        let parsed = Url::parse(url).map_err(|e| PrismicError::NormalizationError {
            path: url.to_string(),
            message: format!("invalid image URL: {}", e),
        })?;

        tracing::debug!("Downloading image {}", url);
        let response = self.client.get(parsed.clone()).send().await?;
        let response = response.error_for_status()?;

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string());
        let bytes = response.bytes().await?;

        let id = nodes.create_node_id(url);
        let (name, extension) = file_name(&parsed);
        let path = if extension.is_empty() {
            format!("{}/{}", self.directory, id)
        } else {
            format!("{}/{}.{}", self.directory, id, extension)
        };
        self.storage.write_file(&path, &bytes).await?;

        let node = FileNode {
            id: id.clone(),
            parent: parent.clone(),
            url: url.to_string(),
            name,
            extension,
            media_type,
            size: bytes.len() as u64,
            path,
            internal: NodeInternal {
                node_type: "File".to_string(),
                content_digest: hex::encode(Sha256::digest(&bytes)),
            },
        };
        nodes.create_node(Node::File(node))?;

        tracing::debug!("Stored {} ({} bytes) as file node {}", url, bytes.len(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use crate::core::environment::MemoryEnvironment;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_from_url() {
        let url = Url::parse("https://images.prismic.io/repo/Hero-Shot.PNG?auto=compress").unwrap();
        assert_eq!(file_name(&url), ("Hero-Shot".to_string(), "png".to_string()));

        let bare = Url::parse("https://images.prismic.io/").unwrap();
        assert_eq!(file_name(&bare), ("file".to_string(), String::new()));
    }

    #[tokio::test]
    async fn test_download_creates_file_node() {
        let server = MockServer::start();
        let image_mock = server.mock(|when, then| {
            when.method(GET).path("/repo/hero.png");
            then.status(200)
                .header("Content-Type", "image/png; charset=binary")
                .body("not-really-a-png");
        });

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().to_string());
        let downloader = HttpImageDownloader::new(storage.clone());
        let nodes = MemoryEnvironment::default();

        let url = server.url("/repo/hero.png");
        let id = downloader
            .download(&url, &"parent-id".to_string(), &nodes)
            .await
            .unwrap();

        image_mock.assert();
        let Some(Node::File(file)) = nodes.get(&id) else {
            panic!("expected a file node");
        };
        assert_eq!(file.parent, "parent-id");
        assert_eq!(file.name, "hero");
        assert_eq!(file.extension, "png");
        assert_eq!(file.media_type.as_deref(), Some("image/png"));
        assert_eq!(file.size, 16);
        assert_eq!(file.internal.node_type, "File");

        let stored = storage.read_file(&file.path).await.unwrap();
        assert_eq!(stored, b"not-really-a-png");
    }

    #[tokio::test]
    async fn test_download_fails_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.png");
            then.status(404);
        });

        let dir = TempDir::new().unwrap();
        let downloader =
            HttpImageDownloader::new(LocalStorage::new(dir.path().to_string_lossy().to_string()));
        let nodes = MemoryEnvironment::default();

        let err = downloader
            .download(&server.url("/missing.png"), &"p".to_string(), &nodes)
            .await
            .unwrap_err();

        assert!(matches!(err, PrismicError::HttpError(_)));
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let dir = TempDir::new().unwrap();
        let downloader =
            HttpImageDownloader::new(LocalStorage::new(dir.path().to_string_lossy().to_string()));
        let nodes = MemoryEnvironment::default();

        let err = downloader
            .download("not a url", &"p".to_string(), &nodes)
            .await
            .unwrap_err();
        assert!(matches!(err, PrismicError::NormalizationError { .. }));
    }
}
