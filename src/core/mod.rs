pub mod documents_to_nodes;
pub mod engine;
pub mod environment;
pub mod link;
pub mod normalizers;
pub mod structured_text;
pub mod type_paths;

pub use crate::domain::model::{Document, Node, NodeId, TypePath};
pub use crate::domain::ports::{FieldNormalizers, NodeEnvironment, Storage};
pub use crate::utils::error::Result;
