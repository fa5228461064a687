// tests/api_tests.rs

use std::sync::Arc;

use case_desk::{
    config::Config,
    models::case::{Case, NewCase, Question, QuestionKind},
    routes,
    state::AppState,
    store::{MemoryStore, Store},
    utils::hash::hash_password,
};
use chrono::{Duration, Utc};
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "admin123";

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        admin_seed_usernames: vec![],
        admin_seed_password: None,
    }
}

/// Spawns the app over an in-memory store on a random port.
/// Returns the base URL and the store for seeding.
async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

async fn seed_case(store: &MemoryStore, unlock_in: Duration) -> Case {
    store
        .create_case(NewCase {
            title: "C1".to_string(),
            brief: "The missing ledger.".to_string(),
            unlock_time: Utc::now() + unlock_in,
            questions: vec![
                Question {
                    prompt: "Which drawer?".to_string(),
                    kind: QuestionKind::Mcq {
                        options: vec!["Top".into(), "Middle".into(), "Bottom".into()],
                        answer: 1,
                    },
                    points: 10,
                },
                Question {
                    prompt: "Which city?".to_string(),
                    kind: QuestionKind::Text {
                        answer: "Paris".to_string(),
                    },
                    points: 10,
                },
                Question {
                    prompt: "Who?".to_string(),
                    kind: QuestionKind::Text {
                        answer: "Clerk".to_string(),
                    },
                    points: 10,
                },
            ],
            max_score: 30,
        })
        .await
        .expect("Failed to seed case")
}

async fn seed_admin(store: &MemoryStore, username: &str) {
    let hash = hash_password(ADMIN_PASSWORD).unwrap();
    store.create_admin(username, &hash).await.unwrap();
}

async fn player_token(client: &reqwest::Client, address: &str, name: &str, number: &str) -> String {
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "name": name, "number": number }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");
    resp["token"].as_str().expect("Token not found").to_string()
}

async fn admin_token(client: &reqwest::Client, address: &str, username: &str) -> String {
    let resp = client
        .post(format!("{}/api/admin/login", address))
        .json(&serde_json::json!({ "username": username, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .expect("Admin login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse admin login json");
    resp["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let store = Arc::new(MemoryStore::new());
    let app = routes::create_router(AppState::new(store, test_config()));

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/random_path_that_does_not_exist")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_registers_then_restores_by_badge_number() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "name": "  Alice ", "number": " A1 " }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);
    let first: serde_json::Value = first.json().await.unwrap();
    assert_eq!(first["player_name"], "Alice");
    assert_eq!(first["player_number"], "A1");

    // Same badge, different name: the stored identity wins
    let second: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "name": "Someone Else", "number": "A1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["player_id"], first["player_id"]);
    assert_eq!(second["player_name"], "Alice");

    assert_eq!(store.list_players().await.unwrap().len(), 1);
}

#[tokio::test]
async fn login_with_blank_fields_is_rejected() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "name": "   ", "number": "A1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert!(store.list_players().await.unwrap().is_empty());
}

#[tokio::test]
async fn protected_routes_require_a_valid_session() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let no_token = client
        .get(format!("{}/api/cases", address))
        .send()
        .await
        .unwrap();
    assert_eq!(no_token.status().as_u16(), 401);

    let forged = client
        .get(format!("{}/api/leaderboard", address))
        .header("Authorization", "Bearer not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status().as_u16(), 401);

    // A player token cannot reach the review panel
    let token = player_token(&client, &address, "Alice", "A1").await;
    let as_player = client
        .get(format!("{}/api/admin/submissions", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(as_player.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_login_checks_password_hash() {
    let (address, store) = spawn_app().await;
    seed_admin(&store, "admin1").await;
    let client = reqwest::Client::new();

    let wrong = client
        .post(format!("{}/api/admin/login", address))
        .json(&serde_json::json!({ "username": "admin1", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    let unknown = client
        .post(format!("{}/api/admin/login", address))
        .json(&serde_json::json!({ "username": "admin3", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 401);

    let token = admin_token(&client, &address, "admin1").await;
    let session: serde_json::Value = client
        .get(format!("{}/api/auth/session", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["role"], "admin");
    assert_eq!(session["name"], "admin1");
}

#[tokio::test]
async fn case_board_shows_lock_state() {
    let (address, store) = spawn_app().await;
    let open = seed_case(&store, Duration::hours(-1)).await;
    let locked = seed_case(&store, Duration::days(2) + Duration::hours(5) + Duration::minutes(1))
        .await;
    let client = reqwest::Client::new();
    let token = player_token(&client, &address, "Alice", "A1").await;

    let board: Vec<serde_json::Value> = client
        .get(format!("{}/api/cases", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(board.len(), 2);
    // Ordered by unlock time
    assert_eq!(board[0]["id"], open.id.to_string());
    assert_eq!(board[0]["unlocked"], true);
    assert_eq!(board[0]["time_until_unlock"], "Unlocked");
    assert_eq!(board[1]["id"], locked.id.to_string());
    assert_eq!(board[1]["unlocked"], false);
    assert_eq!(board[1]["time_until_unlock"], "2d 5h");

    let locked_resp = client
        .get(format!("{}/api/cases/{}", address, locked.id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(locked_resp.status().as_u16(), 403);

    let opened: serde_json::Value = client
        .get(format!("{}/api/cases/{}", address, open.id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let questions = opened["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q.get("answer").is_none()));
}

#[tokio::test]
async fn submit_with_wrong_answer_count_is_rejected() {
    let (address, store) = spawn_app().await;
    let case = seed_case(&store, Duration::hours(-1)).await;
    let client = reqwest::Client::new();
    let token = player_token(&client, &address, "Alice", "A1").await;

    let response = client
        .post(format!("{}/api/cases/{}/submit", address, case.id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "answers": [1, "paris"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert!(store.list_submissions(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn full_review_flow_over_http() {
    let (address, store) = spawn_app().await;
    let case = seed_case(&store, Duration::hours(-1)).await;
    seed_admin(&store, "admin1").await;
    let client = reqwest::Client::new();

    let alice = player_token(&client, &address, "Alice", "A1").await;
    let admin = admin_token(&client, &address, "admin1").await;

    // 1. Submit [1, "paris", -1]
    let submit = client
        .post(format!("{}/api/cases/{}/submit", address, case.id))
        .header("Authorization", format!("Bearer {}", alice))
        .json(&serde_json::json!({ "answers": [1, "paris", -1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 201);

    // 2. Re-entry is blocked
    let attempt: serde_json::Value = client
        .get(format!("{}/api/cases/{}/attempt", address, case.id))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["submitted"], true);

    let reopen = client
        .get(format!("{}/api/cases/{}", address, case.id))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .unwrap();
    assert_eq!(reopen.status().as_u16(), 409);

    let resubmit = client
        .post(format!("{}/api/cases/{}/submit", address, case.id))
        .header("Authorization", format!("Bearer {}", alice))
        .json(&serde_json::json!({ "answers": [0, "lyon", -1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resubmit.status().as_u16(), 409);

    // 3. Admin lists pending (the default filter)
    let pending: Vec<serde_json::Value> = client
        .get(format!("{}/api/admin/submissions", address))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["player_name"], "Alice");
    assert_eq!(pending[0]["answers"], serde_json::json!([1, "paris", -1]));
    assert_eq!(
        pending[0]["checks"],
        serde_json::json!(["correct", "correct", "unanswered"])
    );
    let submission_id = pending[0]["id"].as_str().unwrap().to_string();

    // 4. Approve with an over-the-cap score
    let approved: serde_json::Value = client
        .post(format!(
            "{}/api/admin/submissions/{}/approve",
            address, submission_id
        ))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&serde_json::json!({ "score": 9999 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["score"], 30);

    // 5. A second review is refused
    let reject = client
        .post(format!(
            "{}/api/admin/submissions/{}/reject",
            address, submission_id
        ))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    assert_eq!(reject.status().as_u16(), 409);

    // 6. Player record and leaderboard reflect the approval
    let me: serde_json::Value = client
        .get(format!("{}/api/auth/me", address))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["score"], 30);
    assert_eq!(me["completed_cases"], serde_json::json!([case.id.to_string()]));

    let board: Vec<serde_json::Value> = client
        .get(format!("{}/api/leaderboard", address))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board[0]["name"], "Alice");
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["score"], 30);
}

#[tokio::test]
async fn admin_creates_case_with_validation() {
    let (address, store) = spawn_app().await;
    seed_admin(&store, "admin2").await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address, "admin2").await;

    let bad = client
        .post(format!("{}/api/admin/cases", address))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&serde_json::json!({
            "title": "Broken",
            "brief": "",
            "unlock_time": Utc::now(),
            "questions": [
                { "prompt": "Pick", "type": "mcq", "options": ["a", "b"], "answer": 2, "points": 5 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 400);

    let created: serde_json::Value = client
        .post(format!("{}/api/admin/cases", address))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&serde_json::json!({
            "title": "Fine",
            "brief": "All good.",
            "unlock_time": Utc::now(),
            "questions": [
                { "prompt": "Pick", "type": "mcq", "options": ["a", "b"], "answer": 1, "points": 5 },
                { "q": "Name", "type": "text", "answer": "Holmes", "points": 7 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["max_score"], 12);
    assert_eq!(store.list_cases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn leaderboard_stream_pushes_recomputed_board() {
    let (address, store) = spawn_app().await;
    let case = seed_case(&store, Duration::hours(-1)).await;
    let client = reqwest::Client::new();
    let alice = player_token(&client, &address, "Alice", "A1").await;

    let mut stream = client
        .get(format!("{}/api/leaderboard/stream", address))
        .header("Authorization", format!("Bearer {}", alice))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status().as_u16(), 200);

    let mut received = String::new();
    let initial = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !received.contains("\"score\":0") {
            let chunk = stream.chunk().await.unwrap().expect("stream ended");
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await;
    assert!(initial.is_ok(), "initial leaderboard event not received");
    assert!(received.contains("event: leaderboard"));

    // Approving a submission changes Alice's record and triggers a push
    let player = store.find_player_by_number("A1").await.unwrap().unwrap();
    let sub = store
        .insert_submission(
            player.id,
            case.id,
            vec![
                case_desk::models::submission::Answer::Choice(1),
                case_desk::models::submission::Answer::Unanswered,
                case_desk::models::submission::Answer::Unanswered,
            ],
        )
        .await
        .unwrap();
    case_desk::services::review::approve(store.as_ref(), sub.id, uuid::Uuid::new_v4(), 12, Utc::now())
        .await
        .unwrap();

    received.clear();
    let pushed = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !received.contains("\"score\":12") {
            let chunk = stream.chunk().await.unwrap().expect("stream ended");
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await;
    assert!(pushed.is_ok(), "recomputed leaderboard event not received");
}
