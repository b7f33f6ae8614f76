//! A named table of behaviors a state responds with.

use tracing::warn;

use crate::content::{self, ContentKind};
use crate::error::SessionError;
use crate::node::{fetch, BuildContext, NodeCore};
use crate::registry::{BehaviorFn, BehaviorRegistry};
use crate::spec::{self, ControllerSpec};

/// Holds resolved behaviors in declaration order. Documents reference
/// behaviors by name; resolution against the registry happens while the
/// tree is built, so a running session never touches the registry.
pub struct Controller {
    core: NodeCore,
    behaviors: Vec<(String, BehaviorFn)>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("core", &self.core)
            .field("behaviors", &self.behavior_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Controller {
    pub async fn load(spec: ControllerSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        Self::load_at(spec, ctx, String::new()).await
    }

    pub(crate) async fn load_at(
        spec: ControllerSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<Self, SessionError> {
        let mut controller = Self {
            core: NodeCore::untitled("Controller"),
            behaviors: Vec::new(),
        };
        controller.apply(spec, ctx, base).await?;
        controller.core.emit_load();
        Ok(controller)
    }

    async fn apply(
        &mut self,
        spec: ControllerSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<(), SessionError> {
        if let Some(name) = spec.name {
            self.core.set_name(name);
        }
        self.add_behaviors(&spec.behaviors, ctx.registry);

        if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
            if self.core.source().is_none() {
                let locator = content::join(&base, &src);
                let loaded = fetch(ctx, &locator).await?;
                match loaded.kind {
                    ContentKind::Script => return Err(SessionError::Script(locator)),
                    ContentKind::Structured => {
                        let doc: ControllerSpec =
                            spec::parse_document("Controller", &locator, &loaded.content)?;
                        self.core.set_source(&locator);
                        if let Some(name) = doc.name {
                            self.core.set_name(name);
                        }
                        self.add_behaviors(&doc.behaviors, ctx.registry);
                    }
                    _ => {
                        warn!("controller source '{locator}' is not structured; ignoring");
                        self.core.set_source(&locator);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_behaviors(&mut self, names: &[String], registry: &BehaviorRegistry) {
        for name in names {
            if self.behaviors.iter().any(|(known, _)| known == name) {
                continue;
            }
            match registry.behavior(name) {
                Some(behavior) => self.behaviors.push((name.clone(), behavior)),
                None => warn!(
                    "no behavior registered under '{name}'; controller '{}' skips it",
                    self.core.name()
                ),
            }
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn behavior(&self, name: &str) -> Option<BehaviorFn> {
        self.behaviors
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, behavior)| behavior.clone())
    }

    pub fn behavior_names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryLoader;
    use serde_json::{json, Value};

    fn registry_with_counter() -> BehaviorRegistry {
        let mut registry = BehaviorRegistry::new();
        registry.register("join", |model, payload| {
            model["joined"] = json!(model["joined"].as_i64().unwrap_or(0) + 1);
            payload.clone()
        });
        registry.register("ready", |_, _| Value::Bool(true));
        registry
    }

    #[tokio::test]
    async fn inline_names_resolve_against_the_registry() {
        let loader = MemoryLoader::new();
        let registry = registry_with_counter();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = ControllerSpec {
            name: Some("lobby".into()),
            behaviors: vec!["join".into(), "unheard-of".into(), "ready".into()],
            ..Default::default()
        };
        let controller = Controller::load(spec, &ctx).await.unwrap();

        assert_eq!(controller.name(), "lobby");
        // The unknown name is skipped with a warning, not an error.
        assert_eq!(
            controller.behavior_names().collect::<Vec<_>>(),
            vec!["join", "ready"]
        );
        assert!(controller.behavior("join").is_some());
        assert!(controller.behavior("unheard-of").is_none());
    }

    #[tokio::test]
    async fn manifest_sources_add_behaviors() {
        let mut loader = MemoryLoader::new();
        loader.insert(
            "gm/controllers/lobby.json",
            r#"{"name": "lobby", "behaviors": ["join", "ready"]}"#,
        );
        let registry = registry_with_counter();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = ControllerSpec {
            src: Some("controllers/lobby.json".into()),
            ..Default::default()
        };
        let controller = Controller::load_at(spec, &ctx, "gm".into()).await.unwrap();
        assert_eq!(controller.name(), "lobby");
        assert_eq!(controller.len(), 2);
    }

    #[tokio::test]
    async fn script_sources_are_rejected() {
        let mut loader = MemoryLoader::new();
        loader.insert("logic.js", "exports.clientIsReady = () => true");
        let registry = registry_with_counter();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = ControllerSpec {
            src: Some("logic.js".into()),
            ..Default::default()
        };
        let err = Controller::load(spec, &ctx).await;
        assert!(matches!(err, Err(SessionError::Script(_))));
    }
}
