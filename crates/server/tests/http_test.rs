mod common;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use server::clients::lichess::LichessPuzzle;
use server::coach::GREETING;
use server::puzzle::PuzzleView;

use common::spawn_app;

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let body = get_json(&reqwest::Client::new(), format!("{}/health", app.base_url)).await;
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn moves_update_the_shared_game() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let game = get_json(&client, format!("{}/api/game", app.base_url)).await;
    assert_eq!(game["status"], "White to move");
    assert_eq!(game["history"], json!([]));

    let resp: Value = client
        .post(format!("{}/api/game/move", app.base_url))
        .json(&json!({"move": "e4"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["applied"], true);
    assert_eq!(resp["move"]["san"], "e4");
    assert_eq!(resp["move"]["color"], "w");
    assert_eq!(resp["position"]["status"], "Black to move");

    // Dragging a white piece on black's turn snaps back.
    let rejected: Value = client
        .post(format!("{}/api/game/move", app.base_url))
        .json(&json!({"from": "d2", "to": "d4"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rejected["applied"], false);
    assert!(rejected.get("move").is_none());
    assert_eq!(rejected["position"], resp["position"]);

    let resp: Value = client
        .post(format!("{}/api/game/move", app.base_url))
        .json(&json!({"from": "e7", "to": "e5"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["applied"], true);

    let history = get_json(&client, format!("{}/api/game/history", app.base_url)).await;
    assert_eq!(history, json!({"moves": [{"number": 1, "white": "e4", "black": "e5"}]}));

    let reset: Value = client
        .post(format!("{}/api/game/reset", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset["status"], "White to move");
    assert_eq!(reset["ply"], 0);
    let game = get_json(&client, format!("{}/api/game", app.base_url)).await;
    assert_eq!(game["history"], json!([]));
}

#[tokio::test]
async fn chat_sends_one_message_at_a_time() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let chat_url = format!("{}/api/chat", app.base_url);

    let chat = get_json(&client, chat_url.clone()).await;
    assert_eq!(chat["loading"], false);
    assert_eq!(chat["messages"], json!([{"role": "model", "content": GREETING}]));

    let empty = client
        .post(&chat_url)
        .json(&json!({"message": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body: Value = empty.json().await.unwrap();
    assert!(body["detail"].is_string());

    let sent = client
        .post(&chat_url)
        .json(&json!({"message": "What should I play?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(sent.status(), StatusCode::ACCEPTED);
    let body: Value = sent.json().await.unwrap();
    assert_eq!(body["loading"], true);
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "What should I play?"}));

    let busy = client
        .post(&chat_url)
        .json(&json!({"message": "Hello?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(busy.status(), StatusCode::CONFLICT);

    app.coach.release.notify_one();

    let chat = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let chat = get_json(&client, chat_url.clone()).await;
            if chat["loading"] == false {
                break chat;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("coach reply never arrived");

    let messages = chat["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2]["role"], "model");
    assert_eq!(messages[2]["content"], "Develop your knights before your bishops.");
    assert_eq!(messages[2]["thinking"], "The center is open.");

    let prompts = app.coach.prompts.lock().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Current Chess Game State:\nFEN: "));
    assert!(prompts[0].contains("Turn: White"));
    assert!(prompts[0].ends_with("User Message: What should I play?"));
}

#[tokio::test]
async fn puzzle_panel_loads_once_the_puzzle_arrives() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/puzzle", app.base_url);

    assert_eq!(get_json(&client, url.clone()).await, json!({"loading": true}));

    let puzzle: LichessPuzzle = serde_json::from_value(json!({
        "game": {
            "id": "g42",
            "perf": {"key": "blitz", "name": "Blitz"},
            "rated": true,
            "players": [
                {"name": "Hikaru", "title": "GM", "color": "white", "rating": 3000},
                {"name": "Anon", "color": "black", "rating": 1500}
            ],
            "pgn": "e4 e5 Nf3 Nc6 Bc4"
        },
        "puzzle": {
            "id": "P1zZ",
            "rating": 1600,
            "plays": 99,
            "initialPly": 4,
            "solution": ["f8c5"],
            "themes": ["backRankMate", "endgame"]
        }
    }))
    .unwrap();
    *app.state.puzzle.write() = Some(PuzzleView::new(puzzle));

    let body = get_json(&client, url).await;
    assert_eq!(body["loading"], false);
    assert_eq!(body["players"], "GM Hikaru vs Anon");
    assert_eq!(body["themes"], json!(["back Rank Mate", "endgame"]));
    assert_eq!(body["training_url"], "https://lichess.org/training/P1zZ");
    assert_eq!(body["puzzle"]["rating"], 1600);
    assert!(body["fen"].as_str().unwrap().ends_with(" b KQkq - 3 3"));
}

#[tokio::test]
async fn shell_tracks_tab_and_status() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let shell = get_json(&client, format!("{}/api/shell", app.base_url)).await;
    assert_eq!(
        shell,
        json!({"status": "White to move", "turn": "w", "active_tab": "chat", "voice": "idle"})
    );

    let updated: Value = client
        .put(format!("{}/api/shell/tab", app.base_url))
        .json(&json!({"tab": "history"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["active_tab"], "history");

    let bad = client
        .put(format!("{}/api/shell/tab", app.base_url))
        .json(&json!({"tab": "settings"}))
        .send()
        .await
        .unwrap();
    assert!(bad.status().is_client_error());

    client
        .post(format!("{}/api/game/move", app.base_url))
        .json(&json!({"move": "Nf3"}))
        .send()
        .await
        .unwrap();
    let shell = get_json(&client, format!("{}/api/shell", app.base_url)).await;
    assert_eq!(shell["status"], "Black to move");
    assert_eq!(shell["turn"], "b");
    assert_eq!(shell["active_tab"], "history");
}
