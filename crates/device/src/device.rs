//! A connected client and the view delivery that keeps it current.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use session::{GameMode, Hooks, Phase, State, View};

use crate::transport::Transport;

/// Registration options a client announces when it connects.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Device class, matched against view `type`s.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One connected client. The device remembers what class of screen it
/// is and which role it plays; both decide the view it receives from the
/// current state. Role and data can drift during a session and snap back
/// on [`Device::reset`].
pub struct Device {
    name: String,
    kind: String,
    role: String,
    initial_kind: String,
    initial_role: String,
    uid: String,
    data: Value,
    initial_data: Value,
    should_reset_role: bool,
    should_refresh_view: bool,
    transport: Box<dyn Transport>,
    hooks: Hooks,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("uid", &self.uid)
            .field("kind", &self.kind)
            .field("role", &self.role)
            .finish()
    }
}

impl Device {
    /// Registers a freshly connected client. The uid comes from the spec
    /// or is derived from the transport's remote address and the initial
    /// class and role.
    pub fn connect(spec: DeviceSpec, transport: Box<dyn Transport>) -> Self {
        let name = spec.name.unwrap_or_else(|| "No Device Name".into());
        let kind = spec.kind.unwrap_or_else(|| "default".into());
        let role = spec.role.unwrap_or_else(|| "default".into());
        let data = spec.data.unwrap_or(Value::Null);
        let uid = spec
            .uid
            .unwrap_or_else(|| format!("{}-{kind}-{role}", transport.remote_address()));
        debug!("device '{uid}' connected as {kind}/{role}");
        Self {
            name,
            initial_kind: kind.clone(),
            kind,
            initial_role: role.clone(),
            role,
            uid,
            initial_data: data.clone(),
            data,
            should_reset_role: false,
            should_refresh_view: false,
            transport,
            hooks: Hooks::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Reassigns the device's class until the next reset.
    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    /// Reassigns the device's role until the next reset.
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role.into();
    }

    /// Whether the host should reset this device's role on state changes.
    pub fn should_reset_role(&self) -> bool {
        self.should_reset_role
    }

    pub fn set_should_reset_role(&mut self, value: bool) {
        self.should_reset_role = value;
    }

    /// Whether the host should deliver the current view again.
    pub fn should_refresh_view(&self) -> bool {
        self.should_refresh_view
    }

    pub fn set_should_refresh_view(&mut self, value: bool) {
        self.should_refresh_view = value;
    }

    /// Restores class, role and scratch data to their connection values.
    pub fn reset(&mut self) {
        self.hooks.emit(Phase::Reset);
        self.role = self.initial_role.clone();
        self.kind = self.initial_kind.clone();
        self.data = self.initial_data.clone();
    }

    /// Flags the device for redelivery of its current view.
    pub fn refresh_view(&mut self) {
        self.hooks.emit(Phase::Refresh);
        self.should_refresh_view = true;
    }

    /// One round of the heartbeat. Terminates the transport when the far
    /// end never answered the previous ping; otherwise clears the flag
    /// and pings again. Reports whether the device is still live.
    pub fn check_status(&mut self) -> bool {
        if !self.transport.is_alive() {
            warn!("device '{}' missed its heartbeat; terminating", self.uid);
            self.transport.terminate();
            return false;
        }
        self.transport.set_alive(false);
        self.transport.ping();
        true
    }

    /// Sends one typed message over the device's transport.
    pub fn send_message(&mut self, kind: &str, payload: &str) {
        self.transport.send(kind, payload);
    }

    /// The view this device would render for the given state.
    pub fn best_view<'a>(&self, state: &'a State) -> Option<&'a View> {
        state.best_view(&self.kind, &self.role)
    }

    /// Resolves the best view for the session's current state, renders it
    /// with the session context and delivers it. Reports whether a view
    /// was resolved; an unmatched device is logged and skipped.
    pub fn send_view(&mut self, game: &GameMode) -> bool {
        let Some(state) = game.current_state() else {
            warn!("no current state to send to device '{}'", self.uid);
            return false;
        };
        let Some(view) = self.best_view(state) else {
            error!(
                "no view for device '{}' ({}/{}) in state '{}'",
                self.uid,
                self.kind,
                self.role,
                state.name()
            );
            return false;
        };

        let context = self.render_context(game);
        let rendered = inject::render(view.data(), &context);
        self.send_message("view", &rendered);
        self.should_refresh_view = false;
        debug!("sent view to device '{}'", self.uid);
        true
    }

    /// The data a view template can address: the running session from the
    /// game mode down plus this device's own identity and scratch data.
    fn render_context(&self, game: &GameMode) -> Value {
        let stage = game.current_stage();
        let state = game.current_state();
        json!({
            "gamemode": {
                "name": game.name(),
                "version": game.version(),
                "model": game.model(),
            },
            "stage": {
                "name": stage.map(|s| s.name()),
                "model": stage.map(|s| s.model()),
            },
            "state": {
                "name": state.map(|s| s.name()),
                "model": state.map(|s| s.model()),
            },
            "device": {
                "name": self.name,
                "type": self.kind,
                "role": self.role,
                "uid": self.uid,
                "data": self.data,
            },
        })
    }
}
