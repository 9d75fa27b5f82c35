//! In-process mock of the cyberread backend, plus a harness that wires a
//! `SessionManager` and `Gateway` to it with a file store in a temp dir.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use cyberread_core::auth::{FileSessionStore, PersistedSession, SessionStore};
use cyberread_core::{ApiClient, Gateway, ManualClock, SessionManager, SessionSettings};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse";
pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ROOT_EMAIL: &str = "root@example.com";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// 401 on every refresh
    #[default]
    Reject,
    /// Issue a new token the backend accepts
    Grant,
    /// Issue a new token the backend still rejects
    GrantUnusable,
}

#[derive(Debug, Default)]
pub struct Backend {
    /// token -> user
    pub sessions: HashMap<String, Value>,
    pub refresh: RefreshMode,
    pub logout_fails: bool,
    pub bookmarked: HashSet<String>,
    pub last_profile: Option<Value>,
    /// Fields of the last article create/update; files appear as `file:{name}:{len}`
    pub last_article_form: Option<HashMap<String, String>>,
    pub hits: HashMap<&'static str, usize>,
    pub issued: usize,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresh(mut self, mode: RefreshMode) -> Self {
        self.refresh = mode;
        self
    }

    /// Make `token` valid for alice without going through login.
    pub fn with_session(mut self, token: &str) -> Self {
        self.sessions.insert(token.to_string(), alice());
        self
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.get(route).copied().unwrap_or(0)
    }

    fn hit(&mut self, route: &'static str) {
        *self.hits.entry(route).or_insert(0) += 1;
    }

    fn issue(&mut self, user: Value) -> String {
        self.issued += 1;
        let token = format!("tok-{}", self.issued);
        self.sessions.insert(token.clone(), user);
        token
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(String, Value), Response> {
        bearer(headers)
            .and_then(|token| self.sessions.get(&token).map(|user| (token, user.clone())))
            .ok_or_else(|| reply(StatusCode::UNAUTHORIZED, json!({"message": "Not authorized"})))
    }
}

pub type Shared = Arc<Mutex<Backend>>;

pub fn alice() -> Value {
    json!({
        "_id": "u1",
        "username": "alice",
        "email": ALICE_EMAIL,
        "bio": "",
        "isAdmin": false
    })
}

pub fn root() -> Value {
    json!({
        "_id": "u0",
        "username": "root",
        "email": ROOT_EMAIL,
        "isAdmin": true
    })
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn article(id: &str) -> Value {
    json!({
        "_id": id,
        "title": "Phishing 101",
        "content": "Check the sender before you click.",
        "author": {"_id": "u0", "username": "root"},
        "category": "phishing",
        "tags": ["email"],
        "likes": [],
        "comments": []
    })
}

async fn login(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut backend = backend.lock();
    backend.hit("login");
    let user = match body["email"].as_str() {
        Some(ALICE_EMAIL) => alice(),
        Some(ROOT_EMAIL) => root(),
        _ => return reply(StatusCode::UNAUTHORIZED, json!({"message": "Invalid credentials"})),
    };
    if body["password"].as_str() != Some(PASSWORD) {
        return reply(StatusCode::UNAUTHORIZED, json!({"message": "Invalid credentials"}));
    }
    let token = backend.issue(user.clone());
    reply(StatusCode::OK, json!({"token": token, "user": user}))
}

async fn register(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut backend = backend.lock();
    backend.hit("register");
    if body["username"].as_str() == Some("taken") {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({
                "message": "Validation failed",
                "errors": [{"msg": "Username is already taken"}, "Password is too weak"]
            }),
        );
    }
    let user = json!({
        "_id": "u9",
        "username": body["username"],
        "email": body["email"],
        "isAdmin": false
    });
    let token = backend.issue(user.clone());
    reply(StatusCode::CREATED, json!({"token": token, "user": user}))
}

async fn logout(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("logout");
    if backend.logout_fails {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({"message": "boom"}));
    }
    if let Some(token) = bearer(&headers) {
        backend.sessions.remove(&token);
    }
    reply(StatusCode::OK, json!({"message": "Logged out"}))
}

async fn me(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("me");
    match backend.authorize(&headers) {
        Ok((_, user)) => reply(StatusCode::OK, json!({"user": user})),
        Err(denied) => denied,
    }
}

async fn refresh_token(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("refresh");
    let user = bearer(&headers)
        .and_then(|token| backend.sessions.remove(&token))
        .unwrap_or_else(alice);
    match backend.refresh {
        RefreshMode::Reject => {
            reply(StatusCode::UNAUTHORIZED, json!({"message": "Refresh token expired"}))
        }
        RefreshMode::Grant => {
            let token = backend.issue(user);
            reply(StatusCode::OK, json!({"token": token}))
        }
        RefreshMode::GrantUnusable => reply(StatusCode::OK, json!({"token": "tok-unusable"})),
    }
}

async fn update_profile(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock();
    backend.hit("profile");
    let (token, mut user) = match backend.authorize(&headers) {
        Ok(found) => found,
        Err(denied) => return denied,
    };
    if let (Some(user), Some(changes)) = (user.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            user.insert(key.clone(), value.clone());
        }
    }
    backend.sessions.insert(token, user.clone());
    backend.last_profile = Some(body);
    // Bare identity, no `{user}` envelope
    reply(StatusCode::OK, user)
}

async fn change_password(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock();
    backend.hit("change-password");
    let (token, user) = match backend.authorize(&headers) {
        Ok(found) => found,
        Err(denied) => return denied,
    };
    if body["currentPassword"].as_str() != Some(PASSWORD) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"message": "Current password is incorrect"}),
        );
    }
    backend.sessions.remove(&token);
    let rotated = backend.issue(user);
    reply(StatusCode::OK, json!({"message": "Password updated", "token": rotated}))
}

async fn delete_account(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("delete-account");
    match backend.authorize(&headers) {
        Ok((token, _)) => {
            backend.sessions.remove(&token);
            reply(StatusCode::OK, json!({"message": "Account deleted"}))
        }
        Err(denied) => denied,
    }
}

async fn bookmarks(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("bookmarks");
    if let Err(denied) = backend.authorize(&headers) {
        return denied;
    }
    let list: Vec<Value> = backend.bookmarked.iter().map(|id| article(id)).collect();
    reply(StatusCode::OK, Value::Array(list))
}

async fn bookmark(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = backend.lock();
    backend.hit("bookmark");
    if let Err(denied) = backend.authorize(&headers) {
        return denied;
    }
    if backend.bookmarked.contains(&id) {
        reply(StatusCode::OK, json!({"article": article(&id)}))
    } else {
        reply(StatusCode::NOT_FOUND, json!({"message": "Bookmark not found"}))
    }
}

async fn articles(State(backend): State<Shared>) -> Response {
    backend.lock().hit("articles");
    reply(
        StatusCode::OK,
        json!({
            "articles": [article("a1")],
            "total": 1,
            "currentPage": 1,
            "totalPages": 1
        }),
    )
}

/// Collect a multipart body into name -> value.
async fn read_form(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let Ok(bytes) = field.bytes().await else {
            break;
        };
        let value = match file_name {
            Some(file) => format!("file:{}:{}", file, bytes.len()),
            None => String::from_utf8_lossy(&bytes).into_owned(),
        };
        fields.insert(name, value);
    }
    fields
}

fn article_from_form(id: &str, author: &Value, form: &HashMap<String, String>) -> Value {
    let tags: Value = form
        .get("tags")
        .and_then(|tags| serde_json::from_str(tags).ok())
        .unwrap_or_else(|| json!([]));
    json!({
        "_id": id,
        "title": form.get("title"),
        "content": form.get("content"),
        "author": {"_id": author["_id"], "username": author["username"]},
        "category": form.get("category"),
        "tags": tags,
        "readTime": form.get("readTime").and_then(|t| t.parse::<u32>().ok()).unwrap_or(0),
        "imageUrl": form.get("imageUrl"),
        "videoUrl": form.get("videoUrl"),
        "likes": [],
        "comments": []
    })
}

async fn create_article(
    State(backend): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = read_form(multipart).await;
    let mut backend = backend.lock();
    backend.hit("create-article");
    let user = match backend.authorize(&headers) {
        Ok((_, user)) => user,
        Err(denied) => return denied,
    };
    let article = article_from_form("a9", &user, &form);
    backend.last_article_form = Some(form);
    reply(
        StatusCode::CREATED,
        json!({"message": "Article created successfully", "article": article}),
    )
}

async fn update_article(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let form = read_form(multipart).await;
    let mut backend = backend.lock();
    backend.hit("update-article");
    let user = match backend.authorize(&headers) {
        Ok((_, user)) => user,
        Err(denied) => return denied,
    };
    let article = article_from_form(&id, &user, &form);
    backend.last_article_form = Some(form);
    reply(StatusCode::OK, json!({"article": article}))
}

async fn admin_stats(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let mut backend = backend.lock();
    backend.hit("admin-stats");
    match backend.authorize(&headers) {
        Ok((_, user)) if user["isAdmin"].as_bool() == Some(true) => reply(
            StatusCode::OK,
            json!({"totalUsers": 2, "totalArticles": 1, "totalComments": 0, "totalLikes": 0}),
        ),
        Ok(_) => reply(StatusCode::FORBIDDEN, json!({"message": "Admin access required"})),
        Err(denied) => denied,
    }
}

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/refresh-token", post(refresh_token))
        .route("/api/auth/profile", put(update_profile))
        .route("/api/auth/change-password", put(change_password))
        .route("/api/auth/account", axum::routing::delete(delete_account))
        .route("/api/bookmarks", get(bookmarks))
        .route("/api/bookmarks/{id}", get(bookmark))
        .route("/api/articles", get(articles).post(create_article))
        .route("/api/articles/{id}", put(update_article))
        .route("/api/users/admin/stats", get(admin_stats))
        .with_state(backend)
}

/// Serve `backend` on an ephemeral port. Returns the API base URL.
pub async fn spawn(backend: Backend) -> (String, Shared) {
    let shared = Arc::new(Mutex::new(backend));
    let app = router(shared.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });
    (format!("http://{}/api", addr), shared)
}

pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub session: SessionManager,
    pub gateway: Gateway,
    pub backend: Shared,
    pub store: Arc<FileSessionStore>,
    pub clock: Arc<ManualClock>,
    _dir: TempDir,
}

impl Harness {
    pub async fn start(backend: Backend) -> Self {
        Self::with_record(backend, None).await
    }

    /// Start with `record` already on disk, as if left by a previous run.
    pub async fn with_record(backend: Backend, record: Option<PersistedSession>) -> Self {
        let (base_url, backend) = spawn(backend).await;
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(FileSessionStore::new(dir.path()));
        if let Some(record) = record {
            store.save(&record).expect("seed session file");
        }
        let clock = Arc::new(ManualClock::new(start_time()));
        let api = ApiClient::new(&base_url, std::time::Duration::from_secs(5)).expect("client");
        let session = SessionManager::with_clock(
            api,
            store.clone(),
            SessionSettings::default(),
            clock.clone(),
        );
        let gateway = Gateway::new(session.clone());
        Self {
            session,
            gateway,
            backend,
            store,
            clock,
            _dir: dir,
        }
    }

    pub fn hits(&self, route: &str) -> usize {
        self.backend.lock().hits(route)
    }

    pub fn stored(&self) -> Option<PersistedSession> {
        self.store.load().expect("read session file")
    }

    pub fn stored_json(&self) -> Option<Value> {
        let contents = std::fs::read_to_string(self.store.path()).ok()?;
        serde_json::from_str(&contents).ok()
    }
}
