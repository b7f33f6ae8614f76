//! A phase of the session holding an ordered run of states.

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::content::{self, ContentKind};
use crate::error::SessionError;
use crate::hooks::{Hooks, Phase};
use crate::node::{fetch, BuildContext, NodeCore};
use crate::spec::{self, StageSpec};
use crate::state::State;

/// Stages sequence their states front to back. The stage keeps a cursor
/// to the state currently entered; re-entering a stage (a repeat run)
/// exits the old state and resets every model underneath before state
/// zero starts over.
#[derive(Debug)]
pub struct Stage {
    core: NodeCore,
    model: Value,
    initial_model: Value,
    states: Vec<State>,
    current: Option<usize>,
}

impl Stage {
    pub async fn load(spec: StageSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        Self::load_at(spec, ctx, None).await
    }

    pub(crate) async fn load_at(
        spec: StageSpec,
        ctx: &BuildContext<'_>,
        base: Option<String>,
    ) -> Result<Self, SessionError> {
        let mut stage = Self {
            core: NodeCore::untitled("Stage"),
            model: Value::Null,
            initial_model: Value::Null,
            states: Vec::new(),
            current: None,
        };
        stage.apply(spec, ctx, base).await?;
        stage.core.emit_load();
        Ok(stage)
    }

    /// Merges one document into the stage. `base` is the game mode's
    /// directory context; state sources stay relative to it, not to the
    /// stage document, so a mode can keep all its state files in one
    /// place. A stage built without a game mode (`base` is `None`)
    /// resolves states beside its own document instead.
    fn apply<'a>(
        &'a mut self,
        spec: StageSpec,
        ctx: &'a BuildContext<'a>,
        base: Option<String>,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        async move {
            if let Some(name) = spec.name {
                self.core.set_name(name);
            }
            if let Some(model) = spec.model {
                self.set_model(model);
            }

            if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
                if self.core.source().is_none() {
                    let locator = content::join(base.as_deref().unwrap_or(""), &src);
                    let loaded = fetch(ctx, &locator).await?;
                    match loaded.kind {
                        ContentKind::Script => return Err(SessionError::Script(locator)),
                        ContentKind::Structured => {
                            let doc: StageSpec =
                                spec::parse_document("Stage", &locator, &loaded.content)?;
                            self.core.set_source(&locator);
                            self.apply(doc, ctx, base.clone()).await?;
                        }
                        _ => {
                            warn!("stage source '{locator}' is not structured; ignoring");
                            self.core.set_source(&locator);
                        }
                    }
                }
            }

            let child_base = match base {
                Some(inherited) => inherited,
                None => self.core.base().to_owned(),
            };
            let states = try_join_all(
                spec.states
                    .into_iter()
                    .map(|state| State::load_at(state, ctx, child_base.clone())),
            )
            .await?;
            self.states.extend(states);
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

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        let state = self.states.get(index);
        if state.is_none() {
            warn!("stage '{}' has no state at index {index}", self.core.name());
        }
        state
    }

    pub fn state_mut(&mut self, index: usize) -> Option<&mut State> {
        if index >= self.states.len() {
            warn!("stage '{}' has no state at index {index}", self.core.name());
            return None;
        }
        self.states.get_mut(index)
    }

    pub fn current_state_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_state(&self) -> Option<&State> {
        self.states.get(self.current?)
    }

    pub fn current_state_mut(&mut self) -> Option<&mut State> {
        self.states.get_mut(self.current?)
    }

    pub fn hooks(&self) -> &Hooks {
        self.core.hooks()
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        self.core.hooks_mut()
    }

    /// Restores the stage model and every state underneath.
    pub fn reset(&mut self) {
        self.model = self.initial_model.clone();
        for state in &mut self.states {
            state.reset();
        }
        self.core.hooks().emit(Phase::Reset);
        debug!("reset stage '{}'", self.core.name());
    }

    /// Makes this stage current. A repeat entry exits the running state
    /// and resets the whole stage before starting at state zero again.
    pub(crate) fn enter(&mut self) {
        debug!("entering stage '{}'", self.core.name());
        if let Some(index) = self.current {
            if let Some(state) = self.states.get_mut(index) {
                state.exit();
            }
            self.reset();
        }
        if self.states.is_empty() {
            warn!("stage '{}' has no states to enter", self.core.name());
            self.current = None;
        } else {
            self.current = Some(0);
            self.states[0].enter();
        }
        self.core.hooks().emit(Phase::Enter);
    }

    pub(crate) fn exit(&mut self) {
        debug!("exiting stage '{}'", self.core.name());
        self.core.hooks().emit(Phase::Exit);
    }

    /// Moves the cursor to the given state, exiting the previous one.
    /// Reports whether the transition happened.
    pub fn set_current_state(&mut self, index: usize) -> bool {
        if index >= self.states.len() {
            error!(
                "stage '{}' has no state at index {index}; staying put",
                self.core.name()
            );
            return false;
        }
        if let Some(previous) = self.current {
            if let Some(state) = self.states.get_mut(previous) {
                state.exit();
            }
        }
        self.current = Some(index);
        self.states[index].enter();
        let name = self.states[index].name().to_owned();
        self.core
            .hooks()
            .emit_with(Phase::StateChange, Some(name.as_str()));
        true
    }
}
