//! Declarative documents describing a session tree.
//!
//! These mirror the JSON authoring format: a game-mode document embeds
//! stage documents, stages embed states, states embed views and
//! controllers. Any node may instead point at an external file through
//! `src`; the loaded file parses into the same document type and is
//! applied to the node that referenced it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::SessionError;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GameModeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Directory context that relative sources resolve against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flow: Vec<FlowStep>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceSpec>,
}

/// One scheduled run of a stage, addressed by name.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowStep {
    pub stage: String,
    /// How many times the stage runs before the flow moves on.
    pub repeats: u32,
}

impl FlowStep {
    pub fn new(stage: impl Into<String>, repeats: u32) -> Self {
        Self {
            stage: stage.into(),
            repeats,
        }
    }
}

impl Default for FlowStep {
    fn default() -> Self {
        Self {
            stage: String::new(),
            repeats: 1,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StageSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<StateSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StateSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub controllers: Vec<ControllerSpec>,
    pub validate: Validate,
}

/// How a state decides it is complete.
///
/// Written as JSON `false` / `true` / `"predicate name"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Validate {
    /// The state never reports complete on its own.
    #[default]
    Never,
    /// The state reports complete whenever asked.
    Always,
    /// A predicate registered under this name decides, given the model.
    Predicate(String),
}

impl<'de> Deserialize<'de> for Validate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Validate::Never,
            Raw::Flag(true) => Validate::Always,
            Raw::Name(name) => Validate::Predicate(name),
        })
    }
}

impl Serialize for Validate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Validate::Never => serializer.serialize_bool(false),
            Validate::Always => serializer.serialize_bool(true),
            Validate::Predicate(name) => serializer.serialize_str(name),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Device class this view targets.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Names of behaviors registered with the session's registry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Parses loaded structured content into a document.
///
/// A top-level JSON array is wrapped as `{"data": [...]}` so list files
/// hydrate nodes with a `data` field. Anything that is neither object nor
/// array cannot configure a node.
pub(crate) fn parse_document<T: DeserializeOwned>(
    kind: &'static str,
    locator: &str,
    content: &str,
) -> Result<T, SessionError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| SessionError::parse(locator, e))?;
    let value = match value {
        Value::Array(items) => serde_json::json!({ "data": items }),
        Value::Object(_) => value,
        _ => return Err(SessionError::InvalidOptions(kind)),
    };
    serde_json::from_value(value).map_err(|e| SessionError::parse(locator, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_round_trips() {
        let text = r#"{
            "name": "Trivia Night",
            "version": "1.2.0",
            "model": {"round": 0},
            "flow": [
                {"stage": "Lobby"},
                {"stage": "Questions", "repeats": 3}
            ],
            "stages": [{
                "name": "Lobby",
                "states": [{
                    "name": "Waiting",
                    "validate": "everyone-ready",
                    "views": [
                        {"type": "display", "data": "<h1>{name}</h1>"},
                        {"type": "controller", "role": "host", "src": "views/host.html"}
                    ],
                    "controllers": [{"name": "lobby", "behaviors": ["join", "ready"]}]
                }]
            }],
            "resources": [{"name": "questions", "src": "questions.json"}]
        }"#;

        let doc: GameModeSpec = serde_json::from_str(text).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Trivia Night"));
        assert_eq!(doc.flow[0].repeats, 1);
        assert_eq!(doc.flow[1].repeats, 3);

        let state = &doc.stages[0].states[0];
        assert_eq!(state.validate, Validate::Predicate("everyone-ready".into()));
        assert_eq!(state.views[1].kind.as_deref(), Some("controller"));
        assert_eq!(state.views[1].role.as_deref(), Some("host"));
        assert_eq!(state.controllers[0].behaviors, vec!["join", "ready"]);

        // And back out: `kind` serializes under its wire name.
        let out = serde_json::to_string(&doc).unwrap();
        assert!(out.contains(r#""type":"display""#));
        assert!(out.contains(r#""validate":"everyone-ready""#));
    }

    #[test]
    fn validate_accepts_flags_and_names() {
        let spec: StateSpec = serde_json::from_str(r#"{"validate": true}"#).unwrap();
        assert_eq!(spec.validate, Validate::Always);

        let spec: StateSpec = serde_json::from_str(r#"{"validate": false}"#).unwrap();
        assert_eq!(spec.validate, Validate::Never);

        let spec: StateSpec = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(spec.validate, Validate::Never);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let doc: StageSpec =
            serde_json::from_str(r#"{"name": "s", "comment": "ignored"}"#).unwrap();
        assert_eq!(doc.name.as_deref(), Some("s"));
    }

    #[test]
    fn top_level_arrays_become_data() {
        let doc: ResourceSpec =
            parse_document("Resource", "questions.json", r#"[1, 2, 3]"#).unwrap();
        assert_eq!(doc.data, Some(serde_json::json!([1, 2, 3])));
    }

    #[test]
    fn scalar_documents_are_invalid() {
        let err = parse_document::<ResourceSpec>("Resource", "bad.json", r#""just text""#);
        assert!(matches!(err, Err(SessionError::InvalidOptions("Resource"))));
    }

    #[test]
    fn broken_json_reports_the_locator() {
        let err = parse_document::<GameModeSpec>("GameMode", "gm.json", "{not json");
        match err {
            Err(SessionError::Parse { locator, .. }) => assert_eq!(locator, "gm.json"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
