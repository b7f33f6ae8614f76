//! The root of a session tree and its progression machinery.

use futures::future::{try_join_all, BoxFuture};
use futures::{try_join, FutureExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::content::{self, ContentKind};
use crate::error::SessionError;
use crate::hooks::{Hooks, Phase};
use crate::node::{fetch, BuildContext, NodeCore};
use crate::resource::Resource;
use crate::spec::{self, FlowStep, GameModeSpec};
use crate::stage::Stage;
use crate::state::State;

/// A loaded game mode: the stage tree, shared resources and the flow
/// that schedules stages.
///
/// The flow adds one level of indirection to progression. The stage
/// cursor walks positions `0, 1, 2, ...`, but the stage actually entered
/// at each position is the one the flow step there names. A session ends
/// when the cursor runs off the physical stage list.
#[derive(Debug)]
pub struct GameMode {
    core: NodeCore,
    version: String,
    model: Value,
    initial_model: Value,
    stages: Vec<Stage>,
    resources: Vec<Resource>,
    flow: Vec<FlowStep>,
    /// Logical position of progression, bounds-checked against `stages`.
    current_stage_index: Option<usize>,
    current_flow_index: Option<usize>,
    current_flow_repeat: u32,
    /// Physical index of the stage that last received `enter`, so the
    /// right stage is exited even when the flow reorders stages.
    active: Option<usize>,
    stopped: bool,
}

impl GameMode {
    fn empty() -> Self {
        Self {
            core: NodeCore::untitled("GameMode"),
            version: "0.0.0".into(),
            model: Value::Null,
            initial_model: Value::Null,
            stages: Vec::new(),
            resources: Vec::new(),
            flow: Vec::new(),
            current_stage_index: None,
            current_flow_index: None,
            current_flow_repeat: 0,
            active: None,
            stopped: false,
        }
    }

    /// Builds the whole tree from a document, loading every external
    /// source it references.
    pub async fn load(spec: GameModeSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        let mut game = Self::empty();
        game.apply(spec, ctx).await?;
        game.finish_build();
        game.core.emit_load();
        Ok(game)
    }

    /// Builds a game mode from a single document locator.
    pub async fn from_source(
        locator: impl Into<String>,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, SessionError> {
        Self::load(
            GameModeSpec {
                src: Some(locator.into()),
                ..Default::default()
            },
            ctx,
        )
        .await
    }

    fn apply<'a>(
        &'a mut self,
        spec: GameModeSpec,
        ctx: &'a BuildContext<'a>,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        async move {
            if let Some(name) = spec.name {
                self.core.set_name(name);
            }
            if let Some(version) = spec.version.filter(|v| !v.is_empty()) {
                self.version = version;
            }
            if let Some(path) = spec.path {
                self.core.set_base(path);
            }
            if let Some(model) = spec.model {
                self.set_model(model);
            }
            if !spec.flow.is_empty() {
                self.flow = spec.flow;
            }

            if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
                if self.core.source().is_none() {
                    let locator = content::join(self.core.base(), &src);
                    let loaded = fetch(ctx, &locator).await?;
                    match loaded.kind {
                        ContentKind::Script => return Err(SessionError::Script(locator)),
                        ContentKind::Structured => {
                            let doc: GameModeSpec =
                                spec::parse_document("GameMode", &locator, &loaded.content)?;
                            self.core.set_source(&locator);
                            self.apply(doc, ctx).await?;
                        }
                        _ => {
                            warn!("game mode source '{locator}' is not structured; ignoring");
                            self.core.set_source(&locator);
                        }
                    }
                }
            }

            let child_base = self.core.base().to_owned();
            let stages = try_join_all(
                spec.stages
                    .into_iter()
                    .map(|stage| Stage::load_at(stage, ctx, Some(child_base.clone()))),
            );
            let resources = try_join_all(
                spec.resources
                    .into_iter()
                    .map(|resource| Resource::load_at(resource, ctx, child_base.clone())),
            );
            let (stages, resources) = try_join!(stages, resources)?;
            self.stages.extend(stages);
            self.resources.extend(resources);
            Ok(())
        }
        .boxed()
    }

    /// Fills in a flow for modes that declare none and straightens out
    /// step counts a document got wrong.
    fn finish_build(&mut self) {
        if self.flow.is_empty() {
            self.flow = self
                .stages
                .iter()
                .map(|stage| FlowStep::new(stage.name(), 1))
                .collect();
        }
        for step in &mut self.flow {
            if step.repeats == 0 {
                warn!(
                    "flow step for stage '{}' asks for zero runs; running once",
                    step.stage
                );
                step.repeats = 1;
            }
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn version(&self) -> &str {
        &self.version
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

    pub fn flow(&self) -> &[FlowStep] {
        &self.flow
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage(&self, index: usize) -> Option<&Stage> {
        let stage = self.stages.get(index);
        if stage.is_none() {
            warn!("game mode '{}' has no stage at index {index}", self.core.name());
        }
        stage
    }

    pub fn stage_mut(&mut self, index: usize) -> Option<&mut Stage> {
        if index >= self.stages.len() {
            warn!("game mode '{}' has no stage at index {index}", self.core.name());
            return None;
        }
        self.stages.get_mut(index)
    }

    /// Physical index of the stage with this name.
    pub fn stage_index_named(&self, name: &str) -> Option<usize> {
        let found = self.stages.iter().position(|stage| stage.name() == name);
        if found.is_none() {
            warn!("game mode '{}' has no stage named '{name}'", self.core.name());
        }
        found
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    pub fn hooks(&self) -> &Hooks {
        self.core.hooks()
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        self.core.hooks_mut()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn current_flow_step(&self) -> Option<&FlowStep> {
        let index = self.current_flow_index?;
        let step = self.flow.get(index);
        if step.is_none() {
            warn!(
                "game mode '{}' ran past its flow at position {index}",
                self.core.name()
            );
        }
        step
    }

    /// Physical index of the stage the flow schedules right now.
    fn current_stage_resolved_index(&self) -> Option<usize> {
        let step = self.current_flow_step()?;
        self.stage_index_named(&step.stage)
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current_stage_resolved_index()?)
    }

    pub fn current_stage_mut(&mut self) -> Option<&mut Stage> {
        let index = self.current_stage_resolved_index()?;
        self.stages.get_mut(index)
    }

    pub fn current_state(&self) -> Option<&State> {
        self.current_stage()?.current_state()
    }

    pub fn current_state_mut(&mut self) -> Option<&mut State> {
        self.current_stage_mut()?.current_state_mut()
    }

    /// Starts (or restarts) the session at flow position zero.
    pub fn start(&mut self) {
        self.stopped = false;
        info!("starting game mode '{}'", self.core.name());
        self.core.hooks().emit(Phase::Start);
        self.setup();
        self.current_flow_index = Some(0);
        self.current_flow_repeat = 0;
        self.set_current_stage(0);
    }

    fn setup(&mut self) {
        self.core.hooks().emit(Phase::Setup);
    }

    /// Ends the session. Idempotent; later progression calls warn and
    /// change nothing.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        info!("stopping game mode '{}'", self.core.name());
        self.stopped = true;
        self.core.hooks().emit(Phase::Stop);
    }

    /// Moves the stage cursor, exits whatever stage is running and enters
    /// the stage the flow schedules at the new position. Reports whether
    /// a stage was entered.
    pub fn set_current_stage(&mut self, index: usize) -> bool {
        if index >= self.stages.len() {
            error!(
                "game mode '{}' has no stage at index {index}; staying put",
                self.core.name()
            );
            return false;
        }
        if let Some(previous) = self.active {
            if let Some(stage) = self.stages.get_mut(previous) {
                stage.exit();
            }
        }
        self.current_stage_index = Some(index);
        match self.current_stage_resolved_index() {
            Some(target) => {
                self.stages[target].enter();
                self.active = Some(target);
                let name = self.stages[target].name().to_owned();
                self.core
                    .hooks()
                    .emit_with(Phase::StageChange, Some(name.as_str()));
                true
            }
            None => {
                warn!("flow schedules no stage at position {index}; nothing entered");
                self.active = None;
                false
            }
        }
    }

    /// Advances the session one step: next state, then flow repeats, then
    /// the next stage, and finally [`GameMode::stop`] when the cursor runs
    /// off the stage list.
    pub fn progress(&mut self) {
        if self.stopped {
            warn!(
                "game mode '{}' is stopped; ignoring progress",
                self.core.name()
            );
            return;
        }
        let Some(stage_index) = self.current_stage_resolved_index() else {
            warn!(
                "game mode '{}' has no current stage to progress",
                self.core.name()
            );
            return;
        };

        let next_state = self.stages[stage_index]
            .current_state_index()
            .map_or(0, |index| index + 1);
        if next_state < self.stages[stage_index].state_count() {
            self.stages[stage_index].set_current_state(next_state);
            return;
        }

        // The stage ran out of states; the flow decides what comes next.
        self.current_flow_repeat += 1;
        let repeats = self.current_flow_step().map_or(1, |step| step.repeats);
        if self.current_flow_repeat < repeats {
            self.set_current_stage(self.current_stage_index.unwrap_or(0));
            return;
        }

        let next_stage = self.current_stage_index.map_or(0, |index| index + 1);
        if next_stage >= self.stages.len() {
            self.stop();
            return;
        }
        self.current_flow_repeat = 0;
        self.current_flow_index = Some(self.current_flow_index.map_or(0, |index| index + 1));
        self.set_current_stage(next_stage);
    }

    /// Whether the current state reports complete.
    pub fn is_validated(&self) -> bool {
        self.current_state()
            .map(State::is_validated)
            .unwrap_or(false)
    }

    /// Progresses only when the current state validates. Reports whether
    /// the session moved.
    pub fn progress_if_validated(&mut self) -> bool {
        if !self.is_validated() {
            return false;
        }
        if let Some(state) = self.current_state() {
            debug!("state '{}' validated; progressing", state.name());
        }
        self.progress();
        true
    }

    /// One line of where the session stands, in log-friendly form.
    pub fn status_line(&self) -> String {
        let stage = self
            .current_stage()
            .map(|stage| stage.name().to_owned())
            .unwrap_or_else(|| "-".into());
        let state = self
            .current_state()
            .map(|state| state.name().to_owned())
            .unwrap_or_else(|| "-".into());
        format!("[Stage] : {stage}. [State] : {state}.")
    }

    /// A multi-line dump of the loaded tree, for logs and debugging.
    pub fn summary(&self) -> String {
        let mut out = format!("{} v{}\n", self.core.name(), self.version);
        let flow: Vec<String> = self
            .flow
            .iter()
            .map(|step| {
                if step.repeats > 1 {
                    format!("{} x{}", step.stage, step.repeats)
                } else {
                    step.stage.clone()
                }
            })
            .collect();
        out.push_str(&format!("flow: {}\n", flow.join(", ")));
        for stage in &self.stages {
            out.push_str(&format!(
                "  stage '{}' ({} states)\n",
                stage.name(),
                stage.state_count()
            ));
            for state in stage.states() {
                out.push_str(&format!(
                    "    state '{}' ({} views, {} controllers)\n",
                    state.name(),
                    state.views().len(),
                    state.controllers().len()
                ));
            }
        }
        for resource in &self.resources {
            out.push_str(&format!("  resource '{}'\n", resource.name()));
        }
        out
    }
}
