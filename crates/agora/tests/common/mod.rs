//! In-process fake forum API for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use agora::api::{
    Comment, CreateCommentRequest, CreatePostRequest, LoginRequest, Post, SESSION_HEADER,
    SignupRequest, UpdateCommentRequest, UpdatePostRequest, UserId,
};
use agora::cache::QueryCache;
use agora::client::ForumClient;
use agora::forum::Forum;
use agora::session::SessionStore;

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

// ============================================================================
// State
// ============================================================================

struct User {
    id: UserId,
    username: String,
    password: String,
}

#[derive(Default)]
struct Db {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    sessions: HashMap<String, UserId>,
    next_id: i64,
}

impl Db {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeState {
    db: Mutex<Db>,
    hits: Mutex<HashMap<String, usize>>,
    posts_delay: Mutex<Duration>,
    fail_posts: AtomicBool,
    fail_logout: AtomicBool,
}

impl FakeState {
    fn hit(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
    }

    fn user_for(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        let session_id = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing session"))?;
        self.db
            .lock()
            .unwrap()
            .sessions
            .get(session_id)
            .copied()
            .ok_or_else(|| unauthorized("Invalid session"))
    }
}

fn unauthorized(message: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

fn forbidden() -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "Not the owner" })))
}

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("{} not found", what) })),
    )
}

// ============================================================================
// Fake API
// ============================================================================

/// A running fake API bound to an ephemeral local port.
pub struct FakeApi {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new().nest("/api", routes()).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    /// A forum handle talking to this API with `session`.
    pub fn forum(&self, session: SessionStore) -> Forum {
        let client = ForumClient::new(&self.base_url, session).unwrap();
        Forum::new(client, QueryCache::new())
    }

    /// Number of requests received for `route`, e.g. `"GET /posts"`.
    pub fn hits(&self, route: &str) -> usize {
        self.state.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn add_user(&self, username: &str, password: &str) -> UserId {
        let mut db = self.state.db.lock().unwrap();
        let id = db.next_id();
        db.users.push(User {
            id,
            username: username.to_string(),
            password: password.to_string(),
        });
        id
    }

    pub fn add_post(&self, user_id: UserId, title: &str) -> i64 {
        let mut db = self.state.db.lock().unwrap();
        let id = db.next_id();
        db.posts.push(new_post(id, user_id, title, "Seeded content"));
        id
    }

    pub fn add_comment(&self, post_id: i64, user_id: UserId, content: &str) -> i64 {
        let mut db = self.state.db.lock().unwrap();
        let id = db.next_id();
        db.comments.push(new_comment(id, post_id, user_id, content));
        id
    }

    /// Forget every server-side session, as after a server restart.
    pub fn revoke_sessions(&self) {
        self.state.db.lock().unwrap().sessions.clear();
    }

    pub fn set_posts_delay(&self, delay: Duration) {
        *self.state.posts_delay.lock().unwrap() = delay;
    }

    pub fn fail_posts(&self, fail: bool) {
        self.state.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logout(&self, fail: bool) {
        self.state.fail_logout.store(fail, Ordering::SeqCst);
    }
}

fn new_post(id: i64, user_id: UserId, title: &str, content: &str) -> Post {
    Post {
        id,
        title: title.to_string(),
        content: content.to_string(),
        creation_date: Utc::now(),
        author_user_id: Some(user_id),
        author_username: None,
        is_sticky: false,
        is_locked: false,
        category_id: None,
        additional_notes: None,
    }
}

fn new_comment(id: i64, post_id: i64, user_id: UserId, content: &str) -> Comment {
    Comment {
        id,
        content: content.to_string(),
        creation_date: Utc::now(),
        post_id,
        author_user_id: Some(user_id),
        author_username: None,
    }
}

// ============================================================================
// Routes
// ============================================================================

fn routes() -> Router<Arc<FakeState>> {
    Router::new()
        .route("/ping", get(ping))
        .route("/posts", get(list_posts).post(create_post).put(update_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .route("/posts/user/{id}", get(posts_by_user))
        .route("/posts/category/{id}", get(posts_by_category))
        .route("/comments", post(create_comment).put(update_comment))
        .route("/comments/{id}", axum::routing::delete(delete_comment))
        .route("/comments/post/{id}", get(list_comments))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/users", post(signup))
}

async fn ping(State(state): State<Arc<FakeState>>) -> &'static str {
    state.hit("GET /ping");
    "pong"
}

async fn list_posts(State(state): State<Arc<FakeState>>) -> ApiResult {
    state.hit("GET /posts");
    let delay = *state.posts_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.fail_posts.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "database unavailable" })),
        ));
    }
    let posts = state.db.lock().unwrap().posts.clone();
    Ok(Json(json!(posts)))
}

async fn posts_by_user(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> ApiResult {
    state.hit("GET /posts/user");
    let db = state.db.lock().unwrap();
    let posts: Vec<&Post> = db
        .posts
        .iter()
        .filter(|p| p.author_user_id == Some(id))
        .collect();
    Ok(Json(json!(posts)))
}

async fn posts_by_category(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> ApiResult {
    state.hit("GET /posts/category");
    let db = state.db.lock().unwrap();
    let posts: Vec<&Post> = db
        .posts
        .iter()
        .filter(|p| p.category_id == Some(id))
        .collect();
    Ok(Json(json!(posts)))
}

async fn get_post(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> ApiResult {
    state.hit("GET /posts/{id}");
    let db = state.db.lock().unwrap();
    let post = db
        .posts
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| not_found("Post"))?;
    Ok(Json(json!(post)))
}

async fn create_post(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<CreatePostRequest>,
) -> ApiResult {
    state.hit("POST /posts");
    let user_id = state.user_for(&headers)?;
    let mut db = state.db.lock().unwrap();
    let id = db.next_id();
    let mut post = new_post(id, user_id, &body.title, &body.content);
    post.category_id = body.category_id;
    post.additional_notes = body.additional_notes;
    db.posts.push(post);
    Ok(Json(json!({ "message": "Post created successfully" })))
}

async fn update_post(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<UpdatePostRequest>,
) -> ApiResult {
    state.hit("PUT /posts");
    let user_id = state.user_for(&headers)?;
    let mut db = state.db.lock().unwrap();
    let post = db
        .posts
        .iter_mut()
        .find(|p| p.id == body.post_id)
        .ok_or_else(|| not_found("Post"))?;
    if post.author_user_id != Some(user_id) {
        return Err(forbidden());
    }
    post.title = body.title;
    post.content = body.content;
    post.category_id = body.category_id;
    post.additional_notes = body.additional_notes;
    Ok(Json(json!({ "message": "Post updated successfully" })))
}

async fn delete_post(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    state.hit("DELETE /posts/{id}");
    let user_id = state.user_for(&headers)?;
    let mut db = state.db.lock().unwrap();
    let owner = db
        .posts
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| not_found("Post"))?
        .author_user_id;
    if owner != Some(user_id) {
        return Err(forbidden());
    }
    db.posts.retain(|p| p.id != id);
    db.comments.retain(|c| c.post_id != id);
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

async fn list_comments(State(state): State<Arc<FakeState>>, Path(id): Path<i64>) -> ApiResult {
    state.hit("GET /comments/post/{id}");
    let db = state.db.lock().unwrap();
    let comments: Vec<&Comment> = db.comments.iter().filter(|c| c.post_id == id).collect();
    Ok(Json(json!(comments)))
}

async fn create_comment(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult {
    state.hit("POST /comments");
    let user_id = state.user_for(&headers)?;
    if body.user_id.is_some_and(|id| id != user_id) {
        return Err(forbidden());
    }
    let mut db = state.db.lock().unwrap();
    if !db.posts.iter().any(|p| p.id == body.post_id) {
        return Err(not_found("Post"));
    }
    let id = db.next_id();
    db.comments
        .push(new_comment(id, body.post_id, user_id, &body.content));
    Ok(Json(json!({ "message": "Comment created successfully" })))
}

async fn update_comment(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult {
    state.hit("PUT /comments");
    let user_id = state.user_for(&headers)?;
    let mut db = state.db.lock().unwrap();
    let comment = db
        .comments
        .iter_mut()
        .find(|c| c.id == body.comment_id)
        .ok_or_else(|| not_found("Comment"))?;
    if comment.author_user_id != Some(user_id) {
        return Err(forbidden());
    }
    comment.content = body.content;
    Ok(Json(json!({ "message": "Comment updated successfully" })))
}

async fn delete_comment(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult {
    state.hit("DELETE /comments/{id}");
    let user_id = state.user_for(&headers)?;
    let mut db = state.db.lock().unwrap();
    let owner = db
        .comments
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| not_found("Comment"))?
        .author_user_id;
    if owner != Some(user_id) {
        return Err(forbidden());
    }
    db.comments.retain(|c| c.id != id);
    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<LoginRequest>) -> ApiResult {
    state.hit("POST /login");
    let mut db = state.db.lock().unwrap();
    let user_id = db
        .users
        .iter()
        .find(|u| u.username == body.username && u.password == body.password)
        .map(|u| u.id)
        .ok_or_else(|| unauthorized("Invalid credentials"))?;
    let session_id = format!("sess-{}", db.next_id());
    db.sessions.insert(session_id.clone(), user_id);
    Ok(Json(json!({
        "message": "Login successful",
        "session_id": session_id,
        "user_id": user_id,
    })))
}

async fn logout(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> ApiResult {
    state.hit("POST /logout");
    if state.fail_logout.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "logout failed" })),
        ));
    }
    if let Some(session_id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        state.db.lock().unwrap().sessions.remove(session_id);
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn signup(State(state): State<Arc<FakeState>>, Json(body): Json<SignupRequest>) -> ApiResult {
    state.hit("POST /users");
    let mut db = state.db.lock().unwrap();
    if db.users.iter().any(|u| u.username == body.username) {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Username already taken" })),
        ));
    }
    let id = db.next_id();
    db.users.push(User {
        id,
        username: body.username,
        password: body.password,
    });
    Ok(Json(json!({ "message": "User created successfully" })))
}
