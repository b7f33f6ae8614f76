//! A complete quiz night, from documents to delivered views.
//!
//! The walkthrough covers the full loop:
//! 1. Register the mode's game logic as named behaviors and validators
//! 2. Load the game mode tree from documents
//! 3. Connect a shared display and two phones over loopback transports
//! 4. Feed answers in, progress on validation, deliver fresh views

use serde_json::json;

use device::{Device, DeviceSpec, Envelope, LoopbackPair, LoopbackRemote};
use session::{BehaviorRegistry, BuildContext, GameMode, MemoryLoader, Phase};

// ============================================================================
// DOCUMENTS - what a shipped game mode directory would contain
// ============================================================================

const GM: &str = r#"{
    "name": "Quiz Night",
    "version": "1.0.0",
    "flow": [{"stage": "Lobby"}, {"stage": "Round", "repeats": 2}],
    "stages": [
        {
            "name": "Lobby",
            "states": [{
                "name": "Waiting",
                "model": {"joined": 0},
                "validate": "lobby-full",
                "views": [
                    {"type": "display", "data": "<h1>{gamemode.name}</h1><p>Join on your phone!</p>"},
                    {"type": "mobile", "data": "<button>Join</button>"}
                ],
                "controllers": [{"name": "lobby", "behaviors": ["join"]}]
            }]
        },
        {
            "name": "Round",
            "states": [{
                "name": "Question",
                "model": {
                    "prompt": "Which planet is closest to the sun?",
                    "options": ["Venus", "Mercury", "Mars"],
                    "answers": {}
                },
                "validate": "all-answered",
                "views": [
                    {"type": "display", "src": "views/question.html"},
                    {"type": "mobile", "data": "<p>{state.model.prompt}</p>{state.model.options}[<button>{val}</button>]"}
                ],
                "controllers": [{"name": "quiz", "behaviors": ["answer"]}]
            }]
        }
    ]
}"#;

const QUESTION_VIEW: &str =
    "<h1>{state.model.prompt}</h1><ul>{state.model.options}[<li>{val}</li>]</ul>";

// ============================================================================
// GAME LOGIC - referenced from the documents by name
// ============================================================================

fn quiz_registry() -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry.register("join", |model, _| {
        let joined = model["joined"].as_i64().unwrap_or(0) + 1;
        model["joined"] = json!(joined);
        json!({"joined": joined})
    });
    registry.register("answer", |model, payload| {
        let uid = payload["uid"].as_str().unwrap_or("?").to_owned();
        model["answers"][uid] = payload["choice"].clone();
        json!({"accepted": true})
    });
    registry.register_validator("lobby-full", |model| {
        model["joined"].as_i64().unwrap_or(0) >= 2
    });
    registry.register_validator("all-answered", |model| {
        model["answers"]
            .as_object()
            .map(|answers| answers.len() >= 2)
            .unwrap_or(false)
    });
    registry
}

// ============================================================================
// DELIVERY - one loopback per connected client
// ============================================================================

fn deliver(game: &GameMode, clients: &mut [(Device, LoopbackRemote)]) {
    for (device, remote) in clients.iter_mut() {
        if !device.send_view(game) {
            continue;
        }
        for frame in remote.drain() {
            if let Ok(envelope) = Envelope::from_frame(&frame) {
                println!("  {:>24} <- {}", device.uid(), envelope.data);
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut loader = MemoryLoader::new();
    loader.insert("quiz/gm.json", GM);
    loader.insert("quiz/views/question.html", QUESTION_VIEW);
    let registry = quiz_registry();
    let ctx = BuildContext::new(&loader, &registry);

    let mut game = GameMode::from_source("quiz/gm.json", &ctx).await?;
    println!("{}", game.summary());

    game.hooks_mut().on(Phase::StageChange, |_, stage| {
        println!("== now playing: {} ==", stage.unwrap_or("?"));
    });

    let mut clients = Vec::new();
    for (name, kind, uid) in [
        ("Living Room TV", "display", "tv"),
        ("Ada's Phone", "mobile", "ada"),
        ("Brin's Phone", "mobile", "brin"),
    ] {
        let LoopbackPair { transport, remote } = LoopbackPair::new();
        let device = Device::connect(
            DeviceSpec {
                name: Some(name.into()),
                kind: Some(kind.into()),
                uid: Some(uid.into()),
                ..Default::default()
            },
            Box::new(transport),
        );
        clients.push((device, remote));
    }

    game.start();
    deliver(&game, &mut clients);

    // Two joins fill the lobby and validation lets the session move on.
    for _ in 0..2 {
        if let Some(state) = game.current_state_mut() {
            state.invoke("join", &json!({}));
        }
    }
    game.progress_if_validated();
    deliver(&game, &mut clients);

    // Both phones answer each question of both rounds.
    while !game.is_stopped() {
        for uid in ["ada", "brin"] {
            if let Some(state) = game.current_state_mut() {
                state.invoke("answer", &json!({"uid": uid, "choice": "Mercury"}));
            }
        }
        if game.progress_if_validated() && !game.is_stopped() {
            deliver(&game, &mut clients);
        }
        println!("{}", game.status_line());
    }

    println!("session over");
    Ok(())
}
