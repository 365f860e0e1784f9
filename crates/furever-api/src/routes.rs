use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::WithRejection;
use serde_json::{Map, Value};
use validator::Validate;

use furever_types::api::{
    AddPetRequest, AdoptionRequest, CreatePostRequest, CreatePostResponse, LoginRequest,
    MessageResponse, PostsResponse, RegisterRequest,
};

use crate::error::ApiError;
use crate::{AppState, pets, posts, run_blocking, users};

/// JSON body whose rejections (bad syntax, wrong types, unknown fields)
/// surface as 400 through `ApiError`.
type JsonBody<T> = WithRejection<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users/{username}", get(get_user))
        .route("/user-details/{username}", get(get_user_details))
        .route("/update-user-details/{username}", put(update_user_details))
        .route("/user-posts/{username}", post(create_post).get(get_user_posts))
        .route("/all-user-posts", get(get_all_posts))
        .route("/add-pet", post(add_pet))
        .route("/pets/{pet_id}", get(get_pet))
        .route("/pets/{pet_id}/applications", get(get_pet_applications))
        .route("/user-pets/{username}", get(get_user_pets))
        .route("/all-pets", get(get_all_pets))
        .route("/adopt-pet/{pet_id}", post(adopt_pet))
        .route("/health", get(health))
        .with_state(state)
}

// ── Users ───────────────────────────────────────────────────────────────

/// POST /register — responds with the created account, minus the password.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |db| users::register(db, req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let LoginRequest { username, password } = req;
    let verified = run_blocking(&state, move |db| users::login(db, &username, &password)).await?;
    if !verified {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(MessageResponse::new("Login successful")))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = run_blocking(&state, move |db| users::get_user_summary(db, &username)).await?;
    Ok(Json(summary))
}

pub async fn get_user_details(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let details = run_blocking(&state, move |db| users::get_user_details(db, &username)).await?;
    Ok(Json(details))
}

/// PUT /update-user-details/{username} — the body is any JSON object.
pub async fn update_user_details(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Json(fields), _): JsonBody<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let msg =
        run_blocking(&state, move |db| users::update_user_details(db, &username, fields)).await?;
    Ok(Json(msg))
}

// ── Posts ───────────────────────────────────────────────────────────────

pub async fn create_post(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Json(req), _): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let author = username.clone();
    let post_id = run_blocking(&state, move |db| {
        posts::create_post(db, &author, &req.sharedpost, req.date_posted)
    })
    .await?
    .ok_or_else(|| {
        ApiError::bad_request(format!("Failed to create post for user '{}'", username))
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully".into(),
            post_id,
        }),
    ))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = run_blocking(&state, move |db| posts::fetch_user_posts(db, &username)).await?;
    Ok(Json(PostsResponse { posts }))
}

pub async fn get_all_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = run_blocking(&state, posts::fetch_all_posts).await?;
    Ok(Json(PostsResponse { posts }))
}

// ── Pets ────────────────────────────────────────────────────────────────

pub async fn add_pet(
    State(state): State<AppState>,
    WithRejection(Json(pet), _): JsonBody<AddPetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = run_blocking(&state, move |db| pets::add_pet(db, pet)).await?;
    Ok((StatusCode::CREATED, Json(pet)))
}

pub async fn get_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = run_blocking(&state, move |db| pets::get_pet(db, &pet_id)).await?;
    Ok(Json(pet))
}

pub async fn get_user_pets(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pets = run_blocking(&state, move |db| pets::get_pets(db, &username)).await?;
    Ok(Json(pets))
}

/// GET /all-pets — listing projection only.
pub async fn get_all_pets(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pets = run_blocking(&state, pets::get_all_pets).await?;
    Ok(Json(pets))
}

pub async fn adopt_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
    WithRejection(Json(application), _): JsonBody<AdoptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = run_blocking(&state, move |db| pets::adopt_pet(db, &pet_id, application)).await?;
    Ok((StatusCode::CREATED, Json(msg)))
}

pub async fn get_pet_applications(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let applications =
        run_blocking(&state, move |db| pets::list_applications(db, &pet_id)).await?;
    Ok(Json(applications))
}

pub async fn health() -> &'static str {
    "ok"
}
