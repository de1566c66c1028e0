use crate::error::{InstallError, Result};
use crate::retry::RetryPolicy;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::time::Duration;

const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Downloads artifact bytes into memory.
pub struct ArtifactFetcher {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    show_progress: bool,
}

impl ArtifactFetcher {
    pub fn new(client: Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            retry,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.retry.run("download", || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        tracing::info!("Downloading {}...", url);

        let fail = |reason: String, status: Option<u16>| InstallError::Download {
            url: url.to_string(),
            reason,
            status,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fail(e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status), Some(status.as_u16())));
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = self.progress_bar(total_size);

        // content-length is only a hint
        let mut content = Vec::with_capacity(total_size.min(MAX_PREALLOC) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fail(e.to_string(), None))?;
            content.extend_from_slice(&chunk);
            pb.set_position(content.len() as u64);
        }

        pb.finish_and_clear();
        tracing::debug!("Downloaded {} bytes from {}", content.len(), url);
        Ok(content)
    }

    fn progress_bar(&self, total_size: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Downloading engine");
        pb
    }
}
