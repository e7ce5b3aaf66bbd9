use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::{EngineConfig, NO_VALID_ITEMS_MESSAGE};
use http_body_util::BodyExt;
use serde_json::Value;
use server::{router, AppState, ModelSource};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const CATALOG: &str = "name,rating,genres,release_date,cover_url
Portal 2,95.1,\"['Puzzle', 'Singleplayer']\",2011-04-18,//images/portal2.jpg
Portal,90.0,\"['Puzzle', 'Singleplayer']\",2007-10-10,//images/portal.jpg
Tetris,85.0,\"['Puzzle']\",1984-06-06,
";

fn write_catalog(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("games.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn app(dir: &Path, admin_token: Option<&str>) -> Router {
    let source = ModelSource::Catalog { path: write_catalog(dir, CATALOG), config: EngineConfig::default() };
    let recommender = source.load().unwrap();
    router(AppState::new(recommender, Some(source), admin_token.map(str::to_string)))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, json: Value) -> (StatusCode, Value) {
    let req = Request::post(uri).header("content-type", "application/json").body(Body::from(json.to_string())).unwrap();
    let (status, body) = send(app, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn names(arr: &Value) -> Vec<String> {
    arr.as_array().unwrap().iter().map(|v| v["name"].as_str().unwrap().to_string()).collect()
}

#[tokio::test]
async fn recommend_returns_ranked_games() {
    let dir = tempdir().unwrap();
    let (status, json) = post_json(app(dir.path(), None), "/recommend", serde_json::json!({ "games": ["Portal 2"], "top_n": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json["recommendations"]), vec!["Portal", "Tetris"]);
    assert_eq!(json["recommendations"][0]["cover_url"], "//images/portal.jpg");
    assert_eq!(json["recommendations"][0]["genres"], serde_json::json!(["Puzzle", "Singleplayer"]));
}

#[tokio::test]
async fn recommend_accepts_a_bare_string_and_default_top_n() {
    let dir = tempdir().unwrap();
    let (status, json) = post_json(app(dir.path(), None), "/recommend", serde_json::json!({ "games": "tetris" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json["recommendations"]), vec!["Portal 2", "Portal"]);
}

#[tokio::test]
async fn unknown_games_return_the_sentinel() {
    let dir = tempdir().unwrap();
    let (status, json) = post_json(app(dir.path(), None), "/recommend", serde_json::json!({ "games": "Zzyzx-Nonexistent" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json["recommendations"]), vec![NO_VALID_ITEMS_MESSAGE]);
    assert_eq!(json["unresolved"], serde_json::json!(["Zzyzx-Nonexistent"]));
}

#[tokio::test]
async fn search_and_list() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), None);
    let (status, json) = get(app.clone(), "/games?query=portal&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json["results"]), vec!["Portal 2", "Portal"]);

    let (_, json) = get(app, "/games/all?limit=2").await;
    assert_eq!(json["games"], serde_json::json!(["Portal 2", "Portal"]));
}

#[tokio::test]
async fn reload_requires_token_and_swaps_the_model() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), Some("secret"));

    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "wrong").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    write_catalog(dir.path(), "name,genres\nCeleste,\"['Platform']\"\n");
    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = get(app, "/games/all").await;
    assert_eq!(json["games"], serde_json::json!(["Celeste"]));
}

#[tokio::test]
async fn failed_reload_keeps_serving_the_old_model() {
    let dir = tempdir().unwrap();
    let app = app(dir.path(), Some("secret"));

    write_catalog(dir.path(), "title\nNo name column\n");
    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, json) = get(app, "/games/all").await;
    assert_eq!(json["games"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn reload_is_refused_without_a_configured_token() {
    let dir = tempdir().unwrap();
    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "").body(Body::empty()).unwrap();
    let (status, _) = send(app(dir.path(), None), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/admin/reload").body(Body::empty()).unwrap();
    let (status, _) = send(app(dir.path(), Some("secret")), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_returns_large_catalogs_in_full() {
    let dir = tempdir().unwrap();
    let mut csv = String::from("name,genres\n");
    for i in 0..1500 {
        csv.push_str(&format!("Game {i},\"['Puzzle']\"\n"));
    }
    let source = ModelSource::Catalog { path: write_catalog(dir.path(), &csv), config: EngineConfig::default() };
    let app = router(AppState::new(source.load().unwrap(), None, None));

    let (_, json) = get(app.clone(), "/games/all?limit=5000").await;
    let games = json["games"].as_array().unwrap();
    assert_eq!(games.len(), 1500);
    assert_eq!(games[1499], "Game 1499");

    let (_, json) = get(app, "/games/all?limit=1200").await;
    assert_eq!(json["games"].as_array().unwrap().len(), 1200);
}

#[tokio::test]
async fn cors_echoes_only_configured_origins() {
    let dir = tempdir().unwrap();
    let source = ModelSource::Catalog { path: write_catalog(dir.path(), CATALOG), config: EngineConfig::default() };
    let state = AppState::new(source.load().unwrap(), None, None)
        .with_cors_origins(Some("https://games.example, https://other.example".to_string()));
    let cors_app = router(state);

    let req = Request::get("/health").header("origin", "https://games.example").body(Body::empty()).unwrap();
    let resp = cors_app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "https://games.example");

    let req = Request::get("/health").header("origin", "https://evil.example").body(Body::empty()).unwrap();
    let resp = cors_app.oneshot(req).await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());

    let req = Request::get("/health").header("origin", "https://evil.example").body(Body::empty()).unwrap();
    let resp = app(dir.path(), None).oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}
