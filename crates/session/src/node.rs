//! Per-node bookkeeping shared by every entity in a session tree.

use tracing::debug;

use crate::content::{self, ContentLoader, LoadedContent};
use crate::error::SessionError;
use crate::hooks::{Hooks, Phase};
use crate::registry::BehaviorRegistry;

/// Shared services threaded through tree construction.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub loader: &'a dyn ContentLoader,
    pub registry: &'a BehaviorRegistry,
}

impl<'a> BuildContext<'a> {
    pub fn new(loader: &'a dyn ContentLoader, registry: &'a BehaviorRegistry) -> Self {
        Self { loader, registry }
    }
}

pub(crate) async fn fetch(
    ctx: &BuildContext<'_>,
    locator: &str,
) -> Result<LoadedContent, SessionError> {
    ctx.loader
        .load(locator, !content::is_absolute(locator))
        .await
        .map_err(|source| SessionError::load(locator, source))
}

/// Identity, source tracking, and hooks embedded in each node.
#[derive(Debug)]
pub struct NodeCore {
    kind: &'static str,
    name: String,
    source: Option<String>,
    base: String,
    hooks: Hooks,
}

impl NodeCore {
    /// A fresh core named `Untitled <kind>` until configured.
    pub fn untitled(kind: &'static str) -> Self {
        Self {
            kind,
            name: format!("Untitled {kind}"),
            source: None,
            base: String::new(),
            hooks: Hooks::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Empty names are ignored so a partial document cannot wipe an
    /// already-configured name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.name = name;
        }
    }

    /// The locator this node was hydrated from, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Directory context that children resolve relative sources against:
    /// the source locator with its final segment stripped, unless a base
    /// was configured explicitly.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub(crate) fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    /// Records the resolved source locator. The first writer wins: a
    /// loaded document cannot re-point the node that loaded it. An
    /// explicitly configured base is left alone.
    pub(crate) fn set_source(&mut self, locator: &str) -> bool {
        if self.source.is_some() || locator.is_empty() {
            return false;
        }
        if self.base.is_empty() {
            self.base = content::parent_of(locator).to_owned();
        }
        self.source = Some(locator.to_owned());
        true
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Fired once the node and all of its children finished loading.
    pub(crate) fn emit_load(&self) {
        debug!("{} '{}' loaded", self.kind, self.name);
        self.hooks.emit(Phase::Load);
    }
}
