//! Media acquisition for transfers
//!
//! Images are downloaded directly. Videos are resolved to a direct stream URL
//! by an external extractor (`yt-dlp -g`) and then downloaded the same way.
//! A [`MediaFile`] deletes itself when dropped, so every exit path of the
//! transfer pipeline cleans up.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::parser::MediaSource;
use crate::utils::error::TransferError;
use crate::utils::retry::{with_retry, RetryConfig};

/// Default external video URL extractor
pub const DEFAULT_VIDEO_EXTRACTOR: &str = "yt-dlp";

/// Kind of a downloaded media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn extension(self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video => "mp4",
        }
    }
}

/// Downloaded media, removed from disk on drop
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaFile {
    /// Take ownership of a file on disk
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image or video
    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

impl Drop for MediaFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove media file"),
        }
    }
}

/// Downloads the media of an item to a local file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `source` for item `item_id`
    async fn fetch(&self, source: &MediaSource, item_id: &str) -> Result<MediaFile, TransferError>;
}

/// HTTP downloader with an external video extractor
pub struct HttpMediaFetcher {
    client: Client,
    media_dir: PathBuf,
    retry: RetryConfig,
    video_extractor: String,
}

impl HttpMediaFetcher {
    /// Create a fetcher writing into `media_dir`
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MediaDownload` if the HTTP client cannot be created
    pub fn new(media_dir: impl Into<PathBuf>, timeout: Duration, retry: RetryConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| TransferError::MediaDownload(e.to_string()))?;

        Ok(Self {
            client,
            media_dir: media_dir.into(),
            retry,
            video_extractor: DEFAULT_VIDEO_EXTRACTOR.to_string(),
        })
    }

    /// Use a different video extractor binary
    pub fn with_video_extractor(mut self, program: impl Into<String>) -> Self {
        self.video_extractor = program.into();
        self
    }

    async fn download(&self, url: &str, kind: MediaKind, item_id: &str) -> Result<MediaFile, TransferError> {
        let bytes = with_retry(&self.retry, || async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            response.bytes().await
        })
        .await
        .map_err(|e| TransferError::MediaDownload(e.to_string()))?;

        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .map_err(|e| TransferError::MediaDownload(e.to_string()))?;

        let path = self
            .media_dir
            .join(format!("{item_id}.{}", kind.extension()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| TransferError::MediaDownload(e.to_string()))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Media downloaded");
        Ok(MediaFile::new(path, kind))
    }

    /// Direct stream URL of the video hosted on `page_url`
    async fn resolve_video(&self, page_url: &str) -> Result<String, TransferError> {
        let output = Command::new(&self.video_extractor)
            .args(["-g", "-f", "best[ext=mp4]/best", page_url])
            .output()
            .await
            .map_err(|e| {
                TransferError::MediaDownload(format!("{} could not be run: {e}", self.video_extractor))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransferError::MediaDownload(format!(
                "{} failed: {}",
                self.video_extractor,
                stderr.trim()
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http"))
            .map(str::to_string)
            .ok_or_else(|| TransferError::MediaDownload("no video URL resolved".to_string()))
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    #[instrument(skip(self), fields(item = %item_id))]
    async fn fetch(&self, source: &MediaSource, item_id: &str) -> Result<MediaFile, TransferError> {
        match source {
            MediaSource::Image(url) => self.download(url, MediaKind::Image, item_id).await,
            MediaSource::Video(page_url) => {
                let stream_url = self.resolve_video(page_url).await?;
                self.download(&stream_url, MediaKind::Video, item_id).await
            }
        }
    }
}
