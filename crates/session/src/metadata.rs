//! Media metadata collaborator: source length and stream flags by path.

use std::collections::HashMap;

use parking_lot::RwLock;
use sp_common::seconds_to_us;
use sp_timeline::SourceInfo;
use tracing::debug;

/// What the resolver knows about a source file.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MediaMetadata {
    pub duration_us: i64,
    pub has_video: bool,
    pub has_audio: bool,
}

impl MediaMetadata {
    pub fn new(duration_us: i64, has_video: bool, has_audio: bool) -> Self {
        Self {
            duration_us,
            has_video,
            has_audio,
        }
    }

    pub fn from_seconds(duration_seconds: f64, has_video: bool, has_audio: bool) -> Self {
        Self::new(seconds_to_us(duration_seconds), has_video, has_audio)
    }

    /// Stream flags for track-kind checks. A source is an image when its
    /// extension says so, or when it has video, no audio and no duration.
    pub fn source_info(&self, path: &str) -> SourceInfo {
        let is_image = is_image_path(path)
            || (self.has_video && !self.has_audio && self.duration_us <= 0);
        SourceInfo {
            has_video: self.has_video,
            has_audio: self.has_audio && !is_image,
            is_image,
        }
    }

    /// Full playable length, `None` for stills.
    pub fn source_duration_us(&self, path: &str) -> Option<i64> {
        if self.source_info(path).is_image {
            None
        } else {
            Some(self.duration_us)
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "svg", "heic", "avif",
];

pub fn is_image_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Looks up metadata for a project-relative source path.
pub trait MetadataResolver: Send + Sync {
    fn lookup_metadata(&self, path: &str) -> Option<MediaMetadata>;
}

/// A fixed table of known sources.
#[derive(Debug, Default)]
pub struct MetadataTable {
    entries: RwLock<HashMap<String, MediaMetadata>>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, metadata: MediaMetadata) {
        self.entries.write().insert(path.into(), metadata);
    }

    pub fn with(self, path: impl Into<String>, metadata: MediaMetadata) -> Self {
        self.insert(path, metadata);
        self
    }
}

impl MetadataResolver for MetadataTable {
    fn lookup_metadata(&self, path: &str) -> Option<MediaMetadata> {
        self.entries.read().get(path).copied()
    }
}

/// Memoizes another resolver, misses included.
pub struct CachedMetadata<R> {
    inner: R,
    cache: RwLock<HashMap<String, Option<MediaMetadata>>>,
}

impl<R: MetadataResolver> CachedMetadata<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Forget one path, e.g. after the file was replaced.
    pub fn invalidate(&self, path: &str) -> bool {
        self.cache.write().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: MetadataResolver> MetadataResolver for CachedMetadata<R> {
    fn lookup_metadata(&self, path: &str) -> Option<MediaMetadata> {
        if let Some(hit) = self.cache.read().get(path) {
            return *hit;
        }
        let resolved = self.inner.lookup_metadata(path);
        debug!(path, found = resolved.is_some(), "Metadata resolved");
        self.cache.write().insert(path.to_string(), resolved);
        resolved
    }
}
