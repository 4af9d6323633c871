/*!
 * Tab Content
 * Capability traits for the heavy, disposable resource behind a tab
 */

use super::types::{PreservationLevel, Tab};
use crate::core::errors::ContentError;
use crate::core::types::Size;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Coarse content classification used for memory estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Directory,
    Document,
    Image,
    Media,
    Archive,
    Web,
    #[default]
    Unknown,
}

impl ContentKind {
    /// Classify a location by scheme or extension
    pub fn classify(path: &Path) -> Self {
        let raw = path.to_string_lossy();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Self::Web;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Directory;
        };

        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "doc" | "docx" | "txt" | "md" | "rtf" | "odt" | "xlsx" | "csv" => {
                Self::Document
            }
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "svg" | "tiff" => Self::Image,
            "mp3" | "mp4" | "mkv" | "mov" | "wav" | "flac" | "avi" => Self::Media,
            "zip" | "7z" | "tar" | "gz" | "rar" | "xz" => Self::Archive,
            "html" | "htm" => Self::Web,
            _ => Self::Unknown,
        }
    }
}

/// View state captured before content disposal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedState {
    pub scroll_offset: f64,
    pub selection: Vec<String>,
    pub view_mode: Option<String>,
    /// Unsaved draft, only captured at `Full` preservation
    pub draft: Option<String>,
    pub extras: BTreeMap<String, serde_json::Value>,
}

/// Heavy resource owned by a resident tab
pub trait TabContent: Send + Sync {
    /// Classification used to estimate the resource size
    fn kind(&self) -> ContentKind;

    /// Measured resident size, when the content knows it
    fn size_hint(&self) -> Option<Size> {
        None
    }

    /// Capture auxiliary state for the given preservation level
    fn capture_state(
        &self,
        level: PreservationLevel,
    ) -> BoxFuture<'_, Result<ExtendedState, ContentError>>;

    /// Apply previously captured state to freshly created content
    fn restore_state(&mut self, state: &ExtendedState) -> Result<(), ContentError>;

    /// Release the resource. On error the content must still be usable.
    fn dispose(&mut self) -> BoxFuture<'_, Result<(), ContentError>>;
}

/// Re-creates content for a tab leaving hibernation
pub trait ContentFactory: Send + Sync {
    fn create<'a>(&'a self, tab: &'a Tab) -> BoxFuture<'a, Result<Box<dyn TabContent>, ContentError>>;
}

/// Simple resident content holding an in-memory payload
pub struct InMemoryContent {
    kind: ContentKind,
    payload: Vec<u8>,
    view: ExtendedState,
    disposals: Option<Arc<AtomicUsize>>,
}

impl InMemoryContent {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            payload: Vec::new(),
            view: ExtendedState::default(),
            disposals: None,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_view_state(mut self, view: ExtendedState) -> Self {
        self.view = view;
        self
    }

    /// Count disposals into a shared counter
    pub fn with_disposal_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.disposals = Some(counter);
        self
    }

    pub fn view_state(&self) -> &ExtendedState {
        &self.view
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

impl TabContent for InMemoryContent {
    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn size_hint(&self) -> Option<Size> {
        (!self.payload.is_empty()).then_some(self.payload.len() as Size)
    }

    fn capture_state(
        &self,
        level: PreservationLevel,
    ) -> BoxFuture<'_, Result<ExtendedState, ContentError>> {
        let mut state = self.view.clone();
        if level < PreservationLevel::Full {
            state.draft = None;
        }
        async move { Ok(state) }.boxed()
    }

    fn restore_state(&mut self, state: &ExtendedState) -> Result<(), ContentError> {
        self.view = state.clone();
        Ok(())
    }

    fn dispose(&mut self) -> BoxFuture<'_, Result<(), ContentError>> {
        async move {
            self.payload = Vec::new();
            if let Some(counter) = &self.disposals {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
        .boxed()
    }
}

/// Factory producing `InMemoryContent` classified from the tab's path
#[derive(Debug, Default, Clone)]
pub struct InMemoryContentFactory {
    created: Arc<AtomicUsize>,
}

impl InMemoryContentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contents created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ContentFactory for InMemoryContentFactory {
    fn create<'a>(&'a self, tab: &'a Tab) -> BoxFuture<'a, Result<Box<dyn TabContent>, ContentError>> {
        async move {
            self.created.fetch_add(1, Ordering::SeqCst);
            let content: Box<dyn TabContent> =
                Box::new(InMemoryContent::new(ContentKind::classify(tab.path())));
            Ok(content)
        }
        .boxed()
    }
}
