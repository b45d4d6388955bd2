pub mod document_client;

pub use document_client::{document_path, DocumentFetcher, HttpDocumentFetcher};
