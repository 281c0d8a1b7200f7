//! Transport client for the question-answering backend.
//!
//! The [`Backend`] trait is the seam between client state and the network:
//! four operations, each a single request/response round trip with no
//! retry. [`HttpBackend`] implements it over HTTP with `reqwest`.
//!
//! # Endpoints
//!
//! | Operation | Method | Path | Request | Response |
//! |-----------|--------|------|---------|----------|
//! | list | `GET` | `/files` | - | `{"files": [..]}` |
//! | upload | `POST` | `/upload` | multipart, field `files` repeated | 2xx |
//! | query | `POST` | `/query` | `{"query": ".."}` | [`QueryResponse`] |
//! | clear | `POST` | `/clear` | - | 2xx |
//!
//! Any failure, including a non-2xx status, becomes
//! [`ClientError::BackendUnreachable`]. Error bodies are not decoded.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use qarag_core::models::QueryResponse;

use crate::config::BackendConfig;
use crate::error::{ClientError, ClientResult, Operation};

/// One file payload for an upload request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, using its file name as the upload name.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read upload file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Operations the client needs from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Filenames currently indexed.
    async fn list_documents(&self) -> ClientResult<Vec<String>>;

    /// Upload one or more files in a single request.
    async fn upload_documents(&self, files: Vec<UploadFile>) -> ClientResult<()>;

    /// Ask a question against the indexed documents.
    async fn submit_query(&self, text: &str) -> ClientResult<QueryResponse>;

    /// Discard all indexed documents and server-side session state.
    async fn clear_all(&self) -> ClientResult<()>;

    /// Where the backend lives, for user-facing messages.
    fn location(&self) -> &str;
}

#[derive(Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// [`Backend`] over HTTP.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::unreachable(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::unreachable(
                operation,
                format!("HTTP {}", status),
            ));
        }
        tracing::debug!(%operation, %status, "backend request succeeded");
        Ok(response)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_documents(&self) -> ClientResult<Vec<String>> {
        let op = Operation::ListDocuments;
        let response = self.send(op, self.client.get(self.url("/files"))).await?;
        let body: FilesResponse = response
            .json()
            .await
            .map_err(|e| ClientError::unreachable(op, e))?;
        Ok(body.files)
    }

    async fn upload_documents(&self, files: Vec<UploadFile>) -> ClientResult<()> {
        let op = Operation::UploadDocuments;
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str("application/pdf")
                .map_err(|e| ClientError::unreachable(op, e))?;
            form = form.part("files", part);
        }
        self.send(op, self.client.post(self.url("/upload")).multipart(form))
            .await?;
        Ok(())
    }

    async fn submit_query(&self, text: &str) -> ClientResult<QueryResponse> {
        let op = Operation::SubmitQuery;
        let request = self
            .client
            .post(self.url("/query"))
            .json(&QueryRequest { query: text });
        let response = self.send(op, request).await?;
        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| ClientError::unreachable(op, e))
    }

    async fn clear_all(&self) -> ClientResult<()> {
        self.send(Operation::ClearAll, self.client.post(self.url("/clear")))
            .await?;
        Ok(())
    }

    fn location(&self) -> &str {
        &self.base_url
    }
}

/// True for paths the upload picker accepts (`.pdf`, any case).
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
