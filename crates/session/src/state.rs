//! One step of a stage, with the views and controllers active in it.

use futures::future::{try_join_all, BoxFuture};
use futures::{try_join, FutureExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::content::{self, ContentKind};
use crate::controller::Controller;
use crate::error::SessionError;
use crate::hooks::{Hooks, Phase};
use crate::node::{fetch, BuildContext, NodeCore};
use crate::registry::{BehaviorFn, ValidatorFn};
use crate::spec::{self, StateSpec, Validate};
use crate::view::View;

/// A state owns its model, the views rendered while it is current and
/// the controllers that mutate the model. It reports completion through
/// [`State::is_validated`], which the game mode polls to decide whether
/// the session may progress.
pub struct State {
    core: NodeCore,
    model: Value,
    initial_model: Value,
    views: Vec<View>,
    controllers: Vec<Controller>,
    validate: Validate,
    validator: Option<ValidatorFn>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("core", &self.core)
            .field("model", &self.model)
            .field("views", &self.views.len())
            .field("controllers", &self.controllers.len())
            .field("validate", &self.validate)
            .finish()
    }
}

impl State {
    pub async fn load(spec: StateSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        Self::load_at(spec, ctx, String::new()).await
    }

    pub(crate) async fn load_at(
        spec: StateSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<Self, SessionError> {
        let mut state = Self {
            core: NodeCore::untitled("State"),
            model: Value::Null,
            initial_model: Value::Null,
            views: Vec::new(),
            controllers: Vec::new(),
            validate: Validate::Never,
            validator: None,
        };
        state.apply(spec, ctx, base).await?;
        state.core.emit_load();
        Ok(state)
    }

    /// Merges one document into the state. Loaded documents recurse here,
    /// so values from a `src` file override inline ones while views and
    /// controllers accumulate.
    fn apply<'a>(
        &'a mut self,
        spec: StateSpec,
        ctx: &'a BuildContext<'a>,
        base: String,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        async move {
            if let Some(name) = spec.name {
                self.core.set_name(name);
            }
            if let Some(model) = spec.model {
                self.set_model(model);
            }
            if spec.validate != Validate::Never {
                if let Validate::Predicate(name) = &spec.validate {
                    self.validator = ctx.registry.validator(name);
                    if self.validator.is_none() {
                        warn!(
                            "no validator registered under '{name}'; state '{}' will not self-validate",
                            self.core.name()
                        );
                    }
                }
                self.validate = spec.validate;
            }

            if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
                if self.core.source().is_none() {
                    let locator = content::join(&base, &src);
                    let loaded = fetch(ctx, &locator).await?;
                    match loaded.kind {
                        ContentKind::Script => return Err(SessionError::Script(locator)),
                        ContentKind::Structured => {
                            let doc: StateSpec =
                                spec::parse_document("State", &locator, &loaded.content)?;
                            self.core.set_source(&locator);
                            let doc_base = self.core.base().to_owned();
                            self.apply(doc, ctx, doc_base).await?;
                        }
                        _ => {
                            warn!("state source '{locator}' is not structured; ignoring");
                            self.core.set_source(&locator);
                        }
                    }
                }
            }

            let child_base = if self.core.base().is_empty() {
                base
            } else {
                self.core.base().to_owned()
            };
            let views = try_join_all(
                spec.views
                    .into_iter()
                    .map(|view| View::load_at(view, ctx, child_base.clone())),
            );
            let controllers = try_join_all(
                spec.controllers
                    .into_iter()
                    .map(|controller| Controller::load_at(controller, ctx, child_base.clone())),
            );
            let (views, controllers) = try_join!(views, controllers)?;
            self.views.extend(views);
            self.controllers.extend(controllers);
            Ok(())
        }
        .boxed()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Value {
        &mut self.model
    }

    /// Replaces the model and remembers it as the reset point.
    pub fn set_model(&mut self, model: Value) {
        self.initial_model = model;
        self.model = self.initial_model.clone();
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn hooks(&self) -> &Hooks {
        self.core.hooks()
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        self.core.hooks_mut()
    }

    pub(crate) fn enter(&mut self) {
        debug!("entering state '{}'", self.core.name());
        self.core.hooks().emit(Phase::Enter);
    }

    pub(crate) fn exit(&mut self) {
        self.core.hooks().emit(Phase::Exit);
    }

    /// Restores the model to the last value given to [`State::set_model`].
    pub fn reset(&mut self) {
        self.model = self.initial_model.clone();
        self.core.hooks().emit(Phase::Reset);
        debug!("reset state '{}'", self.core.name());
    }

    /// Attaches a completion predicate directly, bypassing the registry.
    pub fn set_validator(&mut self, validator: impl Fn(&Value) -> bool + Send + Sync + 'static) {
        self.validator = Some(std::sync::Arc::new(validator));
    }

    /// Whether the state considers itself complete.
    pub fn is_validated(&self) -> bool {
        match &self.validator {
            Some(validator) => validator(&self.model),
            None => self.validate == Validate::Always,
        }
    }

    /// Picks the view a device of this class and role should render.
    ///
    /// An exact role match wins; otherwise the first view of the class
    /// whose role is `"default"` stands in.
    pub fn best_view(&self, kind: &str, role: &str) -> Option<&View> {
        let mut fallback = None;
        for view in &self.views {
            if view.kind() != kind {
                continue;
            }
            if view.role() == role {
                return Some(view);
            }
            if view.role() == "default" && fallback.is_none() {
                fallback = Some(view);
            }
        }
        fallback
    }

    /// Looks a behavior up across this state's controllers, first match wins.
    pub fn behavior(&self, name: &str) -> Option<BehaviorFn> {
        for controller in &self.controllers {
            if let Some(behavior) = controller.behavior(name) {
                return Some(behavior);
            }
        }
        warn!(
            "no behavior '{name}' in state '{}'",
            self.core.name()
        );
        None
    }

    /// Runs a behavior against the state's model and hands back its result.
    pub fn invoke(&mut self, name: &str, payload: &Value) -> Option<Value> {
        let behavior = self.behavior(name)?;
        Some(behavior(&mut self.model, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryLoader;
    use crate::registry::BehaviorRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn inline_document_hydrates_children() {
        let loader = MemoryLoader::new();
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec: StateSpec = serde_json::from_str(
            r#"{
                "name": "Waiting",
                "model": {"players": 0},
                "validate": true,
                "views": [
                    {"type": "display", "data": "<h1>Waiting</h1>"},
                    {"type": "controller", "role": "host", "data": "<button>Start</button>"}
                ],
                "controllers": [{"name": "lobby"}]
            }"#,
        )
        .unwrap();
        let state = State::load(spec, &ctx).await.unwrap();

        assert_eq!(state.name(), "Waiting");
        assert_eq!(state.model()["players"], 0);
        assert_eq!(state.views().len(), 2);
        assert_eq!(state.controllers().len(), 1);
        assert!(state.is_validated());
    }

    #[tokio::test]
    async fn predicate_validation_consults_the_model() {
        let loader = MemoryLoader::new();
        let mut registry = BehaviorRegistry::new();
        registry.register_validator("enough-players", |model| {
            model["players"].as_i64().unwrap_or(0) >= 2
        });
        let ctx = BuildContext::new(&loader, &registry);

        let spec: StateSpec = serde_json::from_str(
            r#"{"model": {"players": 1}, "validate": "enough-players"}"#,
        )
        .unwrap();
        let mut state = State::load(spec, &ctx).await.unwrap();

        assert!(!state.is_validated());
        state.model_mut()["players"] = json!(3);
        assert!(state.is_validated());
    }

    #[tokio::test]
    async fn loaded_documents_resolve_children_beside_themselves() {
        let mut loader = MemoryLoader::new();
        loader.insert(
            "gm/states/waiting.json",
            r#"{"name": "Waiting", "views": [{"type": "display", "src": "waiting.html"}]}"#,
        );
        loader.insert("gm/states/waiting.html", "<h1>{title}</h1>");
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec = StateSpec {
            src: Some("states/waiting.json".into()),
            ..Default::default()
        };
        let state = State::load_at(spec, &ctx, "gm".into()).await.unwrap();

        assert_eq!(state.name(), "Waiting");
        assert_eq!(state.views()[0].data(), "<h1>{title}</h1>");
    }

    #[tokio::test]
    async fn best_view_prefers_exact_role() {
        let loader = MemoryLoader::new();
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec: StateSpec = serde_json::from_str(
            r#"{"views": [
                {"type": "display", "data": "shared"},
                {"type": "display", "role": "host", "data": "private"}
            ]}"#,
        )
        .unwrap();
        let state = State::load(spec, &ctx).await.unwrap();

        assert_eq!(state.best_view("display", "host").unwrap().data(), "private");
        assert_eq!(state.best_view("display", "player").unwrap().data(), "shared");
        assert!(state.best_view("controller", "host").is_none());
    }

    #[tokio::test]
    async fn invoking_a_behavior_mutates_the_model() {
        let loader = MemoryLoader::new();
        let mut registry = BehaviorRegistry::new();
        registry.register("join", |model, payload| {
            let count = model["players"].as_i64().unwrap_or(0) + 1;
            model["players"] = json!(count);
            json!({"joined": payload["who"], "players": count})
        });
        let ctx = BuildContext::new(&loader, &registry);

        let spec: StateSpec = serde_json::from_str(
            r#"{"model": {"players": 0}, "controllers": [{"behaviors": ["join"]}]}"#,
        )
        .unwrap();
        let mut state = State::load(spec, &ctx).await.unwrap();

        let ack = state.invoke("join", &json!({"who": "ada"})).unwrap();
        assert_eq!(ack["players"], 1);
        assert_eq!(state.model()["players"], 1);
        assert!(state.invoke("missing", &Value::Null).is_none());
    }

    #[tokio::test]
    async fn reset_restores_the_initial_model() {
        let loader = MemoryLoader::new();
        let registry = BehaviorRegistry::new();
        let ctx = BuildContext::new(&loader, &registry);

        let spec: StateSpec =
            serde_json::from_str(r#"{"model": {"round": 1, "scores": [10]}}"#).unwrap();
        let mut state = State::load(spec, &ctx).await.unwrap();

        state.model_mut()["round"] = json!(5);
        state.model_mut()["scores"][0] = json!(99);
        state.reset();
        assert_eq!(state.model(), &json!({"round": 1, "scores": [10]}));
    }
}
