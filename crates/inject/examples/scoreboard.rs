//! Renders a scoreboard view from a JSON model.
//!
//! Demonstrates scalar substitution, collection iteration with a custom
//! separator, nested templates, and the leave-in-place behavior for tokens
//! that do not resolve (watch the log output for the warning).

use serde_json::json;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let model = json!({
        "round": 3,
        "players": [
            {"name": "ada",  "score": 12, "answers": ["yes", "no"]},
            {"name": "brin", "score": 9,  "answers": ["no", "no"]},
        ],
    });

    println!("=== Scalar substitution ===");
    println!("{}", inject::render("Round {round}", &model));
    println!();

    println!("=== Collection iteration ===");
    let table = inject::render(
        "{players@\n}[{name}: {score} points]",
        &model,
    );
    println!("{table}");
    println!();

    println!("=== Nested templates ===");
    let answers = inject::render(
        "{players@; }[{name} said {answers@, }[{val}]]",
        &model,
    );
    println!("{answers}");
    println!();

    println!("=== Unresolvable token stays put ===");
    println!("{}", inject::render("Winner: {winner}", &model));
}
