//! Declarative session trees for multi-device parlor games.
//!
//! A game mode document describes a tree of stages, states, views and
//! controllers, plus a flow that schedules the stages. [`GameMode::load`]
//! hydrates the whole tree asynchronously, pulling referenced documents
//! through a [`ContentLoader`]; the loaded mode then runs as a
//! hierarchical state machine driven by [`GameMode::progress`].
//!
//! Game logic stays out of the documents. Documents name behaviors and
//! validators, and the host registers the matching functions in a
//! [`BehaviorRegistry`] before the tree is built.
//!
//! # Example
//!
//! ```ignore
//! use session::{BehaviorRegistry, BuildContext, FsLoader, GameMode};
//!
//! let loader = FsLoader::with_root("gamemodes");
//! let mut registry = BehaviorRegistry::new();
//! registry.register_validator("everyone-ready", |model| {
//!     model["ready"] == model["players"]
//! });
//! let ctx = BuildContext::new(&loader, &registry);
//!
//! let mut game = GameMode::from_source("trivia/gm.json", &ctx).await?;
//! game.start();
//! while !game.is_stopped() {
//!     // feed device input to the current state, then:
//!     game.progress_if_validated();
//! }
//! ```

pub mod content;
pub mod controller;
pub mod error;
pub mod game_mode;
pub mod hooks;
pub mod node;
pub mod registry;
pub mod resource;
pub mod spec;
pub mod stage;
pub mod state;
pub mod view;

// Re-export main types
pub use content::{ContentKind, ContentLoader, FsLoader, LoadError, LoadedContent, MemoryLoader};
pub use controller::Controller;
pub use error::SessionError;
pub use game_mode::GameMode;
pub use hooks::{Hook, Hooks, Phase};
pub use node::BuildContext;
pub use registry::{BehaviorFn, BehaviorRegistry, ValidatorFn};
pub use resource::Resource;
pub use spec::{
    ControllerSpec, FlowStep, GameModeSpec, ResourceSpec, StageSpec, StateSpec, Validate, ViewSpec,
};
pub use stage::Stage;
pub use state::State;
pub use view::View;
