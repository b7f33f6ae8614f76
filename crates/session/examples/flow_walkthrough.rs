//! Walks a session through its flow, narrating every transition.
//!
//! Run with `RUST_LOG=debug` to see the runtime's own transition logs
//! interleaved with the hook output:
//!
//! ```text
//! RUST_LOG=debug cargo run -p session --example flow_walkthrough
//! ```

use std::sync::{Arc, Mutex};

use session::{BehaviorRegistry, BuildContext, GameMode, GameModeSpec, MemoryLoader, Phase};

const DOC: &str = r#"{
    "name": "Sketch & Guess",
    "flow": [
        {"stage": "Lobby"},
        {"stage": "Round", "repeats": 3},
        {"stage": "Podium"}
    ],
    "stages": [
        {"name": "Podium", "states": [{"name": "Winner"}]},
        {"name": "Lobby", "states": [{"name": "Waiting"}]},
        {
            "name": "Round",
            "model": {"secret": "lighthouse"},
            "states": [{"name": "Draw"}, {"name": "Guess"}, {"name": "Score"}]
        }
    ]
}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let loader = MemoryLoader::new();
    let registry = BehaviorRegistry::new();
    let ctx = BuildContext::new(&loader, &registry);

    let spec: GameModeSpec = serde_json::from_str(DOC)?;
    let mut game = GameMode::load(spec, &ctx).await?;
    println!("{}", game.summary());

    // The stages sit in one order, the flow plays them in another.
    let transitions = Arc::new(Mutex::new(0u32));
    {
        let transitions = transitions.clone();
        game.hooks_mut().on(Phase::StageChange, move |_, stage| {
            *transitions.lock().unwrap() += 1;
            println!("-> stage: {}", stage.unwrap_or("?"));
        });
    }

    game.start();
    println!("   {}", game.status_line());
    while !game.is_stopped() {
        game.progress();
        println!("   {}", game.status_line());
    }

    println!(
        "session over after {} stage transitions",
        transitions.lock().unwrap()
    );
    Ok(())
}
