use std::path::Path;
use std::sync::Arc;
use futures_util::StreamExt;
use headers::HeaderMapExt;
use log::debug;
use reqwest::{Client, Request, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use crate::download::chunk_range::ChunkInfo;
use crate::download::error::FetchError;
use crate::download::hook::DownloadHook;
use crate::download::util::clone_request;

/// Fetches one byte range into its own artifact file
pub struct ChunkItem {
    client: Client,
    hook: Arc<dyn DownloadHook>,
    // total resource size, used to clamp the last range
    content_length: u64,
    strict: bool,
    pub chunk_info: ChunkInfo,
}

impl ChunkItem {
    pub fn new(
        chunk_info: ChunkInfo,
        client: Client,
        hook: Arc<dyn DownloadHook>,
        content_length: u64,
        strict: bool,
    ) -> Self {
        Self {
            client,
            hook,
            content_length,
            strict,
            chunk_info,
        }
    }

    /// Bytes this chunk must produce
    pub fn expected_len(&self) -> u64 {
        self.chunk_info.range.available_len(self.content_length)
    }

    /// Streams the range into `artifact`, truncating it first. Returns the bytes written.
    ///
    /// A failure leaves whatever was written on disk.
    pub async fn download(&self, request: &Request, artifact: &Path) -> Result<u64, FetchError> {
        let file = File::create(artifact).await.map_err(FetchError::CreateArtifact)?;
        let expected = self.expected_len();

        // nothing of the resource falls into this span
        if expected == 0 {
            debug!("part{} covers no bytes, skip request", self.chunk_info.index);
            self.hook.on_chunk_complete(&self.chunk_info, 0);
            return Ok(0);
        }

        let range = self.chunk_info.range;
        let range_header = range.to_range_header()
            .ok_or(FetchError::InvalidRange { start: range.start, end: range.end })?;
        let mut range_request = clone_request(request);
        range_request.headers_mut().typed_insert(range_header);

        self.hook.on_request(&self.chunk_info, &range_request);
        let response = self.client.execute(range_request).await?;
        let status = response.status();
        self.hook.on_response(&self.chunk_info, status, response.headers());

        if self.strict && status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::UnexpectedStatus(status));
        }

        let mut writer = BufWriter::new(file);
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            writer.write_all(&bytes).await.map_err(FetchError::Copy)?;

            let len = bytes.len() as u64;
            written += len;
            self.hook.on_bytes_received(&self.chunk_info, len);
        }
        writer.flush().await.map_err(FetchError::Copy)?;

        if self.strict && written != expected {
            return Err(FetchError::LengthMismatch { expected, actual: written });
        }

        self.hook.on_chunk_complete(&self.chunk_info, written);
        Ok(written)
    }
}
