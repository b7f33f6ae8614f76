//! A templated face of a state, targeted at one device class and role.

use crate::content::{self, ContentKind};
use crate::error::SessionError;
use crate::hooks::Hooks;
use crate::node::{fetch, BuildContext, NodeCore};
use crate::spec::ViewSpec;

/// Raw templated content plus the device class/role it is meant for.
/// Matching against connected devices happens in
/// [`crate::state::State::best_view`].
#[derive(Debug)]
pub struct View {
    core: NodeCore,
    kind: String,
    role: String,
    data: String,
}

impl View {
    pub async fn load(spec: ViewSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        Self::load_at(spec, ctx, String::new()).await
    }

    pub(crate) async fn load_at(
        spec: ViewSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<Self, SessionError> {
        let mut view = Self {
            core: NodeCore::untitled("View"),
            kind: "default".to_owned(),
            role: "default".to_owned(),
            data: String::new(),
        };
        view.apply(spec, ctx, base).await?;
        view.core.emit_load();
        Ok(view)
    }

    async fn apply(
        &mut self,
        spec: ViewSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<(), SessionError> {
        if let Some(name) = spec.name {
            self.core.set_name(name);
        }
        if let Some(kind) = spec.kind.filter(|k| !k.is_empty()) {
            self.kind = kind;
        }
        if let Some(role) = spec.role.filter(|r| !r.is_empty()) {
            self.role = role;
        }
        if let Some(data) = spec.data {
            self.data = data;
        }

        if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
            if self.core.source().is_none() {
                let locator = content::join(&base, &src);
                let loaded = fetch(ctx, &locator).await?;
                if loaded.kind == ContentKind::Script {
                    return Err(SessionError::Script(locator));
                }
                self.core.set_source(&locator);
                // The file is the template itself, whatever its kind.
                self.data = loaded.content;
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Device class this view targets.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// The unrendered template text.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn hooks(&self) -> &Hooks {
        self.core.hooks()
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        self.core.hooks_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryLoader;
    use crate::registry::BehaviorRegistry;

    #[tokio::test]
    async fn inline_views_default_sensibly() {
        let loader = MemoryLoader::new();
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let view = View::load(ViewSpec::default(), &ctx).await.unwrap();
        assert_eq!(view.name(), "Untitled View");
        assert_eq!(view.kind(), "default");
        assert_eq!(view.role(), "default");
        assert_eq!(view.data(), "");
    }

    #[tokio::test]
    async fn external_source_becomes_the_template() {
        let mut loader = MemoryLoader::new();
        loader.insert("gm/views/board.html", "<h1>{title}</h1>");
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = ViewSpec {
            kind: Some("display".into()),
            src: Some("views/board.html".into()),
            ..Default::default()
        };
        let view = View::load_at(spec, &ctx, "gm".into()).await.unwrap();
        assert_eq!(view.kind(), "display");
        assert_eq!(view.data(), "<h1>{title}</h1>");
    }

    #[tokio::test]
    async fn script_sources_are_rejected() {
        let mut loader = MemoryLoader::new();
        loader.insert("view.js", "module.exports = {}");
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = ViewSpec {
            src: Some("view.js".into()),
            ..Default::default()
        };
        let err = View::load(spec, &ctx).await;
        assert!(matches!(err, Err(SessionError::Script(_))));
    }
}
