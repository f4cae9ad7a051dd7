use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use moviehub::config::{load_config_from_str, ServerConfig};
use moviehub::db::connect_in_memory;
use moviehub::repos::UserRepo;
use moviehub::rest::router;
use moviehub::AppState;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

// ─── Test helpers ───────────────────────────────────────────────────────

const TEST_CONFIG: &str = r#"
database:
  url: "sqlite::memory:"
auth:
  jwt_secret: "integration-secret"
  password_hashing:
    memory_kib: 1024
    iterations: 1
    parallelism: 1
"#;

async fn setup() -> (Router, SqlitePool) {
    let config = load_config_from_str(TEST_CONFIG).unwrap();
    let pool = connect_in_memory().await.unwrap();
    let state = AppState::new(pool.clone(), &config).unwrap();
    (router(state, &ServerConfig::default()), pool)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, email: &str, password: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": email, "password": password, "name": name})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

/// Register a user, promote it in storage and return a token for it.
async fn admin_token(app: &Router, pool: &SqlitePool) -> String {
    let body = register(app, "admin@example.com", "password123", "Admin").await;
    let user_id = body["user_id"].as_i64().unwrap();
    UserRepo::set_admin(pool, user_id, true).await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_movie(app: &Router, token: &str, movie: Value) -> Value {
    let (status, body) = send(app, request("POST", "/api/admin/movies", Some(token), Some(movie))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

// ─── Auth ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_login_roundtrip() {
    let (app, _) = setup().await;
    let registered = register(&app, "viewer@example.com", "password123", "Viewer").await;
    assert_eq!(registered["is_admin"], false);
    assert_eq!(registered["email"], "viewer@example.com");
    assert_eq!(registered["expires_in"], 86400);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "viewer@example.com", "password": "password123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], registered["user_id"]);
    assert!(body["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let (app, _) = setup().await;
    register(&app, "dup@example.com", "password123", "Dup").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "dup@example.com", "password": "password123", "name": "Again"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "x@example.com", "password": "", "name": "X"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let bad_json = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _) = setup().await;
    register(&app, "known@example.com", "password123", "Known").await;

    let wrong_password = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "known@example.com", "password": "wrong-password"})),
        ),
    )
    .await;
    let unknown_email = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "password123"})),
        ),
    )
    .await;
    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn test_refresh_token() {
    let (app, pool) = setup().await;
    let registered = register(&app, "rising@example.com", "password123", "Rising").await;
    let token = registered["token"].as_str().unwrap();

    UserRepo::set_admin(&pool, registered["user_id"].as_i64().unwrap(), true)
        .await
        .unwrap();

    let (status, body) = send(&app, request("POST", "/api/auth/refresh", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["user_id"], registered["user_id"]);

    let (status, body) = send(&app, request("POST", "/api/auth/refresh", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        request("POST", "/api/auth/refresh", Some("not.a.token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Access control ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_protected_routes_need_bearer_token() {
    let (app, _) = setup().await;
    let registered = register(&app, "me@example.com", "password123", "Me").await;
    let token = registered["token"].as_str().unwrap();

    let (status, _) = send(&app, request("GET", "/api/users/profile", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let basic = Request::builder()
        .method("GET")
        .uri("/api/users/profile")
        .header("Authorization", format!("Basic {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, basic).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization header format");

    let (status, body) = send(&app, request("GET", "/api/users/profile", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "me@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_admin_gate() {
    let (app, pool) = setup().await;
    let viewer = register(&app, "viewer@example.com", "password123", "Viewer").await;
    let viewer_token = viewer["token"].as_str().unwrap();
    let admin = admin_token(&app, &pool).await;

    let movie = json!({"title": "Heat", "release_year": 1995});
    let (status, body) = send(
        &app,
        request("POST", "/api/admin/movies", Some(viewer_token), Some(movie.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let (status, _) = send(&app, request("POST", "/api/admin/movies", None, Some(movie.clone()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    create_movie(&app, &admin, movie).await;

    let (status, body) = send(&app, request("GET", "/api/admin/users", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // demotion takes effect on the next request with the same token
    let admin_id = UserRepo::get_by_email(&pool, "admin@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;
    UserRepo::set_admin(&pool, admin_id, false).await.unwrap();
    let (status, _) = send(&app, request("GET", "/api/admin/users", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Catalog ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_movie_listing_pagination() {
    let (app, pool) = setup().await;
    let admin = admin_token(&app, &pool).await;
    for i in 0..7 {
        create_movie(
            &app,
            &admin,
            json!({"title": format!("Film {}", i), "release_year": 2000 + i, "rating": i as f64}),
        )
        .await;
    }

    let (status, body) = send(&app, request("GET", "/api/movies?page=3&page_size=3", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 7);
    assert_eq!(body["page"], 3);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["movies"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, request("GET", "/api/movies?page=0", None, None)).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 10);
    assert_eq!(body["movies"].as_array().unwrap().len(), 7);

    let (_, body) = send(&app, request("GET", "/api/movies?sort_by=rating_desc", None, None)).await;
    let ratings: Vec<f64> = body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["rating"].as_f64().unwrap())
        .collect();
    assert!(ratings.windows(2).all(|w| w[0] >= w[1]));

    let (status, _) = send(&app, request("GET", "/api/movies?sort_by=bogus", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("GET", "/api/movies?year=abc", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid year");
}

#[tokio::test]
async fn test_movie_filters() {
    let (app, pool) = setup().await;
    let admin = admin_token(&app, &pool).await;
    create_movie(
        &app,
        &admin,
        json!({"title": "The Matrix", "release_year": 1999, "categories": ["Action", "Sci-Fi"]}),
    )
    .await;
    create_movie(
        &app,
        &admin,
        json!({"title": "Notting Hill", "release_year": 1999, "categories": ["Romance"]}),
    )
    .await;

    let (_, body) = send(&app, request("GET", "/api/movies?search=MATRIX", None, None)).await;
    assert_eq!(body["total"], 1);

    let (_, body) = send(
        &app,
        request("GET", "/api/movies?categories=Romance&categories=Western", None, None),
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["movies"][0]["title"], "Notting Hill");

    let (_, body) = send(&app, request("GET", "/api/movies?year=1999&categories=Sci-Fi,Romance", None, None)).await;
    assert_eq!(body["total"], 2);

    let (_, body) = send(&app, request("GET", "/api/movies?year=2000", None, None)).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_movie_crud() {
    let (app, pool) = setup().await;
    let admin = admin_token(&app, &pool).await;
    let movie = create_movie(
        &app,
        &admin,
        json!({"title": "Alien", "release_year": 1979, "duration": 117, "rating": 8.5}),
    )
    .await;
    let id = movie["id"].as_i64().unwrap();
    create_movie(&app, &admin, json!({"title": "Aliens", "release_year": 1986})).await;

    let (status, body) = send(&app, request("GET", &format!("/api/movies/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Alien");

    let (status, _) = send(
        &app,
        request("POST", "/api/admin/movies", Some(&admin), Some(json!({"title": "Alien", "release_year": 2000}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/movies/{}", id),
            Some(&admin),
            Some(json!({"title": "Aliens"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/movies/{}", id),
            Some(&admin),
            Some(json!({"title": "Alien", "duration": 116})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["duration"], 116);
    assert_eq!(body["rating"], 8.5);

    let (status, _) = send(&app, request("DELETE", &format!("/api/admin/movies/{}", id), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, request("GET", &format!("/api/movies/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Movie not found");

    let (status, body) = send(&app, request("GET", "/api/movies/not-a-number", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid movie ID");
}

#[tokio::test]
async fn test_category_lifecycle() {
    let (app, pool) = setup().await;
    let admin = admin_token(&app, &pool).await;

    let (status, western) = send(
        &app,
        request("POST", "/api/admin/categories", Some(&admin), Some(json!({"name": "Western"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, noir) = send(
        &app,
        request("POST", "/api/admin/categories", Some(&admin), Some(json!({"name": "Noir"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    create_movie(
        &app,
        &admin,
        json!({"title": "Unforgiven", "release_year": 1992, "categories": ["Western"]}),
    )
    .await;

    let (_, body) = send(
        &app,
        request("GET", &format!("/api/movies?category_id={}", western["id"]), None, None),
    )
    .await;
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        &app,
        request("DELETE", &format!("/api/admin/categories/{}", western["id"]), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Category is being used by movies");

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/admin/categories/{}", noir["id"]), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, request("GET", "/api/categories", None, None)).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Western"]);

    let (status, _) = send(&app, request("GET", &format!("/api/categories/{}", noir["id"]), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Users ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_update_and_favorites() {
    let (app, pool) = setup().await;
    let admin = admin_token(&app, &pool).await;
    let movie = create_movie(&app, &admin, json!({"title": "Paprika", "release_year": 2006})).await;
    let user = register(&app, "fan@example.com", "password123", "Fan").await;
    let token = user["token"].as_str().unwrap();

    let (status, body) = send(
        &app,
        request("PUT", "/api/users/profile", Some(token), Some(json!({"name": "Big Fan"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Big Fan");

    let (status, _) = send(
        &app,
        request("PUT", "/api/users/profile", Some(token), Some(json!({"name": ""}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let fav_uri = format!("/api/users/favorites/{}", movie["id"]);
    let (status, _) = send(&app, request("POST", &fav_uri, Some(token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, request("GET", "/api/users/favorites", Some(token), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // deleting the movie clears the favorite
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/admin/movies/{}", movie["id"]), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, request("GET", "/api/users/favorites", Some(token), None)).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        request("GET", &format!("/api/admin/users/{}", user["user_id"]), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Big Fan");
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
