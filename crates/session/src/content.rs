//! Content loading for declarative session sources.
//!
//! Nodes reference external definitions by locator (a path or URL). The
//! [`ContentLoader`] trait keeps the actual fetch pluggable: [`FsLoader`]
//! reads from disk, [`MemoryLoader`] serves registered strings for tests
//! and demos. Loaders return the raw text plus a [`ContentKind`] classified
//! from the locator's extension; interpreting the content is the caller's
//! job.

use std::collections::HashMap;
use std::path::PathBuf;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

/// What a locator's extension says about its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Executable source (`.js`). Never evaluated; see
    /// [`crate::error::SessionError::Script`].
    Script,
    /// JSON documents (`.json`).
    Structured,
    /// Markup templates (`.html`, `.htm`).
    Markup,
    /// Anything else: opaque text.
    Raw,
}

impl ContentKind {
    /// Classifies a locator by the extension of its final segment.
    pub fn from_locator(locator: &str) -> Self {
        let name = locator
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(locator);
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("js") => ContentKind::Script,
            Some("json") => ContentKind::Structured,
            Some("html") | Some("htm") => ContentKind::Markup,
            _ => ContentKind::Raw,
        }
    }
}

/// Raw content returned by a loader.
#[derive(Clone, Debug)]
pub struct LoadedContent {
    pub content: String,
    pub kind: ContentKind,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no content registered under '{0}'")]
    Missing(String),
}

/// Fetches declarative content by locator.
///
/// `local` asks the loader to resolve the locator against its own root
/// instead of taking it verbatim.
pub trait ContentLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        locator: &'a str,
        local: bool,
    ) -> BoxFuture<'a, Result<LoadedContent, LoadError>>;
}

/// Loads content from the filesystem.
#[derive(Clone, Debug, Default)]
pub struct FsLoader {
    root: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locators loaded with `local = true` resolve under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl ContentLoader for FsLoader {
    fn load<'a>(
        &'a self,
        locator: &'a str,
        local: bool,
    ) -> BoxFuture<'a, Result<LoadedContent, LoadError>> {
        async move {
            let path = match (&self.root, local) {
                (Some(root), true) => root.join(locator),
                _ => PathBuf::from(locator),
            };
            let content = tokio::fs::read_to_string(&path).await?;
            Ok(LoadedContent {
                content,
                kind: ContentKind::from_locator(locator),
            })
        }
        .boxed()
    }
}

/// Serves registered strings keyed by exact locator.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    entries: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.entries.insert(locator.into(), content.into());
        self
    }
}

impl ContentLoader for MemoryLoader {
    fn load<'a>(
        &'a self,
        locator: &'a str,
        _local: bool,
    ) -> BoxFuture<'a, Result<LoadedContent, LoadError>> {
        let result = match self.entries.get(locator) {
            Some(content) => Ok(LoadedContent {
                content: content.clone(),
                kind: ContentKind::from_locator(locator),
            }),
            None => Err(LoadError::Missing(locator.to_owned())),
        };
        futures::future::ready(result).boxed()
    }
}

/// True for locators that need no base: rooted paths and URLs.
pub fn is_absolute(locator: &str) -> bool {
    locator.starts_with('/') || locator.contains("://")
}

/// Everything before the final segment of a locator; empty when the
/// locator has a single segment.
pub fn parent_of(locator: &str) -> &str {
    match locator.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Joins a relative locator onto a base directory. Absolute locators pass
/// through untouched.
pub fn join(base: &str, locator: &str) -> String {
    if base.is_empty() || is_absolute(locator) {
        locator.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{locator}")
    } else {
        format!("{base}/{locator}")
    }
}
