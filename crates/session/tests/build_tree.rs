//! Integration tests for tree construction:
//! - Hydrating a nested document layout from disk
//! - State sources resolving against the game mode root, not the stage file
//! - Values from loaded documents overriding inline ones
//! - Script sources failing the whole build

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::json;

use session::{
    BehaviorRegistry, BuildContext, FlowStep, FsLoader, GameMode, GameModeSpec, MemoryLoader,
    SessionError,
};

/// Lays the trivia fixture out the way a shipped game mode directory
/// looks: one entry document, stage files beside it and state, view and
/// resource files in their own folders.
fn write_trivia_fixture(root: &Path) {
    fs::create_dir_all(root.join("stages")).expect("create stages dir");
    fs::create_dir_all(root.join("states")).expect("create states dir");
    fs::create_dir_all(root.join("views")).expect("create views dir");
    fs::create_dir_all(root.join("resources")).expect("create resources dir");

    fs::write(
        root.join("gm.json"),
        r#"{
            "name": "Trivia Night",
            "version": "1.0.0",
            "model": {"round": 0},
            "flow": [{"stage": "Lobby"}, {"stage": "Round", "repeats": 2}],
            "stages": [
                {"src": "stages/lobby.json"},
                {"src": "stages/round.json"}
            ],
            "resources": [{"src": "resources/questions.json"}]
        }"#,
    )
    .expect("write gm.json");

    fs::write(
        root.join("stages/lobby.json"),
        r#"{"name": "Lobby", "states": [{"src": "states/waiting.json"}]}"#,
    )
    .expect("write lobby.json");

    fs::write(
        root.join("stages/round.json"),
        r#"{
            "name": "Round",
            "model": {"asked": 0},
            "states": [
                {"name": "Question", "views": [{"type": "display", "src": "views/question.html"}]},
                {"name": "Scores", "views": [{"type": "display", "data": "<h1>Scores</h1>"}]}
            ]
        }"#,
    )
    .expect("write round.json");

    fs::write(
        root.join("states/waiting.json"),
        r#"{
            "name": "Waiting",
            "validate": "everyone-ready",
            "views": [{"type": "display", "data": "<h1>Waiting for players</h1>"}],
            "controllers": [{"name": "lobby", "behaviors": ["join"]}]
        }"#,
    )
    .expect("write waiting.json");

    fs::write(
        root.join("views/question.html"),
        "<h1>{prompt}</h1><ul>{options}[<li>{val}</li>]</ul>",
    )
    .expect("write question.html");

    fs::write(
        root.join("resources/questions.json"),
        r#"{"name": "questions", "data": [{"prompt": "2+2?", "options": ["3", "4"]}]}"#,
    )
    .expect("write questions.json");
}

fn trivia_registry() -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry.register("join", |model, payload| {
        let count = model["players"].as_i64().unwrap_or(0) + 1;
        model["players"] = json!(count);
        json!({"joined": payload, "players": count})
    });
    registry.register_validator("everyone-ready", |model| {
        model["ready"] == model["players"]
    });
    registry
}

#[tokio::test]
async fn a_directory_layout_hydrates_the_whole_tree() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_trivia_fixture(dir.path());

    let loader = FsLoader::with_root(dir.path());
    let registry = trivia_registry();
    let ctx = BuildContext::new(&loader, &registry);

    let game = GameMode::from_source("gm.json", &ctx)
        .await
        .expect("load game mode");

    assert_eq!(game.name(), "Trivia Night");
    assert_eq!(game.version(), "1.0.0");
    assert_eq!(game.model()["round"], 0);
    assert_eq!(
        game.flow(),
        &[FlowStep::new("Lobby", 1), FlowStep::new("Round", 2)]
    );

    assert_eq!(game.stage_count(), 2);
    let lobby = game.stage(0).expect("lobby stage");
    assert_eq!(lobby.name(), "Lobby");

    // The waiting state sits in states/, referenced from stages/lobby.json
    // but resolved against the game mode root.
    let waiting = lobby.state(0).expect("waiting state");
    assert_eq!(waiting.name(), "Waiting");
    assert_eq!(waiting.views()[0].data(), "<h1>Waiting for players</h1>");
    assert!(waiting.controllers()[0].behavior("join").is_some());

    let round = game.stage(1).expect("round stage");
    assert_eq!(round.name(), "Round");
    assert_eq!(round.state_count(), 2);
    assert_eq!(
        round.state(0).expect("question state").views()[0].data(),
        "<h1>{prompt}</h1><ul>{options}[<li>{val}</li>]</ul>"
    );

    let questions = game.resource("questions").expect("questions resource");
    assert_eq!(questions.data()[0]["prompt"], "2+2?");
}

#[tokio::test]
async fn loaded_documents_override_inline_values() {
    let mut loader = MemoryLoader::new();
    loader.insert(
        "gm.json",
        r#"{"name": "Shipped Name", "stages": [{"name": "FromFile"}]}"#,
    );
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let spec: GameModeSpec = serde_json::from_value(json!({
        "name": "Inline Name",
        "src": "gm.json",
        "stages": [{"name": "Inline"}]
    }))
    .expect("parse spec");
    let game = GameMode::load(spec, &ctx).await.expect("load game mode");

    // Scalars from the file win; stage lists accumulate, file first.
    assert_eq!(game.name(), "Shipped Name");
    assert_eq!(game.stage_count(), 2);
    assert_eq!(game.stage(0).expect("file stage").name(), "FromFile");
    assert_eq!(game.stage(1).expect("inline stage").name(), "Inline");
}

#[tokio::test]
async fn a_path_option_anchors_relative_sources() {
    let mut loader = MemoryLoader::new();
    loader.insert(
        "library/trivia/gm.json",
        r#"{"name": "Trivia", "stages": [{"src": "stages/lobby.json"}]}"#,
    );
    loader.insert(
        "library/trivia/stages/lobby.json",
        r#"{"name": "Lobby"}"#,
    );
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let spec = GameModeSpec {
        path: Some("library/trivia".into()),
        src: Some("gm.json".into()),
        ..Default::default()
    };
    let game = GameMode::load(spec, &ctx).await.expect("load game mode");

    assert_eq!(game.name(), "Trivia");
    assert_eq!(game.stage(0).expect("lobby").name(), "Lobby");
}

#[tokio::test]
async fn script_sources_fail_the_build() {
    let mut loader = MemoryLoader::new();
    loader.insert(
        "gm.json",
        r#"{"stages": [{"states": [{"src": "logic.js"}]}]}"#,
    );
    loader.insert("logic.js", "exports.validate = () => true");
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let err = GameMode::from_source("gm.json", &ctx).await;
    match err {
        Err(SessionError::Script(locator)) => assert_eq!(locator, "logic.js"),
        other => panic!("expected a script error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_documents_name_the_locator() {
    let loader = MemoryLoader::new();
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let err = GameMode::from_source("nowhere/gm.json", &ctx).await;
    match err {
        Err(SessionError::Load { locator, .. }) => assert_eq!(locator, "nowhere/gm.json"),
        other => panic!("expected a load error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_files_hydrate_resource_data() {
    let mut loader = MemoryLoader::new();
    loader.insert(
        "gm.json",
        r#"{"resources": [{"name": "prompts", "src": "prompts.json"}]}"#,
    );
    loader.insert("prompts.json", r#"["draw a cat", "draw a house"]"#);
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let game = GameMode::from_source("gm.json", &ctx)
        .await
        .expect("load game mode");
    let prompts = game.resource("prompts").expect("prompts resource");
    assert_eq!(prompts.data(), &json!(["draw a cat", "draw a house"]));
}

#[tokio::test]
async fn unknown_behavior_names_are_skipped() {
    let mut loader = MemoryLoader::new();
    loader.insert(
        "gm.json",
        r#"{"stages": [{"states": [{"controllers": [{"behaviors": ["known", "unknown"]}]}]}]}"#,
    );
    let mut registry = BehaviorRegistry::new();
    registry.register("known", |_, payload| payload.clone());
    let ctx = BuildContext::new(&loader, &registry);

    let game = GameMode::from_source("gm.json", &ctx)
        .await
        .expect("load game mode");
    let controller = &game.stage(0).expect("stage").state(0).expect("state").controllers()[0];
    assert_eq!(controller.behavior_names().collect::<Vec<_>>(), vec!["known"]);
}
