//! Ahead-of-time registration of domain logic.
//!
//! Declarative documents cannot carry code. Message handlers (behaviors)
//! and validation predicates are registered by name before a tree is
//! built; controllers and states then reference them by those names. A
//! document naming something that was never registered degrades with a
//! warning instead of failing the build.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A named domain-logic callback. Receives the owning state's model and
/// the triggering payload; returns a reply for the caller.
pub type BehaviorFn = Arc<dyn Fn(&mut Value, &Value) -> Value + Send + Sync>;

/// Decides whether a state is complete, given its model.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, BehaviorFn>,
    validators: HashMap<String, ValidatorFn>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, behavior: F) -> &mut Self
    where
        F: Fn(&mut Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.behaviors.insert(name.into(), Arc::new(behavior));
        self
    }

    pub fn register_validator<F>(&mut self, name: impl Into<String>, validator: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(name.into(), Arc::new(validator));
        self
    }

    pub fn behavior(&self, name: &str) -> Option<BehaviorFn> {
        self.behaviors.get(name).cloned()
    }

    pub fn validator(&self, name: &str) -> Option<ValidatorFn> {
        self.validators.get(name).cloned()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("behaviors", &self.behaviors.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registered_behaviors_are_retrievable() {
        let mut registry = BehaviorRegistry::new();
        registry.register("bump", |model, _payload| {
            model["count"] = json!(model["count"].as_i64().unwrap_or(0) + 1);
            Value::Null
        });

        let bump = registry.behavior("bump").unwrap();
        let mut model = json!({"count": 1});
        bump(&mut model, &Value::Null);
        assert_eq!(model["count"], json!(2));

        assert!(registry.behavior("missing").is_none());
    }

    #[test]
    fn validators_are_separate_from_behaviors() {
        let mut registry = BehaviorRegistry::new();
        registry.register_validator("all-in", |model| {
            model["joined"] == model["expected"]
        });

        let check = registry.validator("all-in").unwrap();
        assert!(check(&json!({"joined": 4, "expected": 4})));
        assert!(!check(&json!({"joined": 2, "expected": 4})));
        assert!(registry.behavior("all-in").is_none());
    }
}
