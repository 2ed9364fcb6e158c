use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::chat::ChatService;
use crate::app::comments::CommentService;
use crate::app::feed::FeedService;
use crate::app::images::{ImageKind, ImageLimit, ImageService};
use crate::app::interactions::InteractionService;
use crate::app::posts::PostService;
use crate::app::users::UserService;
use crate::domain::comment::{AuthoredComment, Comment, CommentView};
use crate::domain::interaction::{CommentLikeToggle, DislikeResponse, FollowToggle, LikeResponse};
use crate::domain::message::{ChatMessage, ChatOpened, Message};
use crate::domain::post::{Page, Post, PostDetail, PostDraft};
use crate::domain::user::{FollowCounts, PublicUser, User, UserSummary};
use crate::http::{AppError, AuthUser, JsonBody};
use crate::AppState;

const ME_RELATION_LIMIT: i64 = 100;
const PROFILE_RELATION_LIMIT: i64 = 50;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.access_ttl_minutes,
    )
}

fn feed_service(state: &AppState) -> FeedService {
    FeedService::new(
        state.db.clone(),
        state.cache.clone(),
        state.feed_page_size,
        state.feed_cache_ttl_seconds,
    )
}

fn with_post_image(state: &AppState, mut post: Post) -> Post {
    post.image_url = Some(state.storage.public_url(&post.image));
    post
}

fn with_profile_image(state: &AppState, mut user: User) -> User {
    user.profile_image_url = Some(state.storage.public_url(&user.profile_image));
    user
}

fn with_summary_images(state: &AppState, users: Vec<UserSummary>) -> Vec<UserSummary> {
    users
        .into_iter()
        .map(|mut user| {
            user.image = Some(state.storage.public_url(&user.profile_image));
            user
        })
        .collect()
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = auth_service(&state)
        .register(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(|err| AppError::from_service(err, "failed to register"))?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(with_profile_image(&state, user))))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }

    let token = auth_service(&state)
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| AppError::from_service(err, "failed to login"))?;

    match token {
        Some(token) => Ok(Json(AuthTokenResponse {
            access_token: token.access_token,
            expires_at: token.expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct FeedQuery {
    pub page: Option<String>,
}

pub async fn list_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Page<Post>>, AppError> {
    let mut page = feed_service(&state)
        .list_feed(query.page.as_deref())
        .await
        .map_err(|err| AppError::from_service(err, "failed to load feed"))?;

    page.items = page
        .items
        .into_iter()
        .map(|post| with_post_image(&state, post))
        .collect();
    Ok(Json(page))
}

/// Fields of the post create/update form. An empty file part counts as no
/// image.
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    image: Option<Bytes>,
}

impl PostForm {
    fn draft(&self) -> PostDraft {
        PostDraft {
            title: self.title.clone().unwrap_or_default(),
            content: self.content.clone().unwrap_or_default(),
        }
    }
}

fn multipart_error(err: MultipartError, limit: ImageLimit) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::bad_request(limit.too_large_message);
    }
    AppError::bad_request(err.body_text())
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let limit = ImageKind::Post.limit();
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                form.title = Some(field.text().await.map_err(|err| multipart_error(err, limit))?);
            }
            "content" => {
                form.content = Some(field.text().await.map_err(|err| multipart_error(err, limit))?);
            }
            "image" | "post_image" => {
                let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
                if !bytes.is_empty() {
                    form.image = Some(bytes);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn store_image(
    state: &AppState,
    kind: ImageKind,
    bytes: Option<Bytes>,
) -> Result<Option<String>, AppError> {
    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let key = ImageService::new(state.storage.clone())
        .store(kind, bytes)
        .await
        .map_err(|err| AppError::from_service(err, "failed to store image"))?;
    Ok(Some(key))
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let form = read_post_form(multipart).await?;
    let draft = form.draft();
    draft.validate()?;

    let image_key = store_image(&state, ImageKind::Post, form.image).await?;
    let post = PostService::new(state.db.clone())
        .create_post(auth.user_id, &draft, image_key.as_deref())
        .await
        .map_err(|err| AppError::from_service(err, "failed to create post"))?;

    feed_service(&state).invalidate().await;
    tracing::info!(post_uuid = %post.uuid, author_id = auth.user_id, "post created");
    Ok((StatusCode::CREATED, Json(with_post_image(&state, post))))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<PostDetail>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let detail = PostService::new(state.db.clone())
        .detail(id, viewer_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch post"))?;

    match detail {
        Some(mut detail) => {
            detail.post = with_post_image(&state, detail.post);
            Ok(Json(detail))
        }
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let existing = service
        .require_post(id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch post"))?;
    if existing.author_id != auth.user_id {
        return Err(AppError::forbidden("only the author can update this post"));
    }

    let form = read_post_form(multipart).await?;
    let draft = form.draft();
    draft.validate()?;

    let image_key = store_image(&state, ImageKind::Post, form.image).await?;
    let post = service
        .update_post(id, auth.user_id, &draft, image_key.as_deref())
        .await
        .map_err(|err| AppError::from_service(err, "failed to update post"))?;

    feed_service(&state).invalidate().await;
    Ok(Json(with_post_image(&state, post)))
}

pub async fn delete_post(Path(_id): Path<Uuid>, _auth: AuthUser) -> Result<StatusCode, AppError> {
    Err(AppError::not_implemented("deleting posts is not implemented"))
}

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeResponse>, AppError> {
    let toggle = InteractionService::new(state.db.clone())
        .toggle_like(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to toggle like"))?;

    Ok(Json(toggle.into()))
}

pub async fn dislike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DislikeResponse>, AppError> {
    let toggle = InteractionService::new(state.db.clone())
        .toggle_dislike(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to toggle dislike"))?;

    Ok(Json(toggle.into()))
}

#[derive(Deserialize)]
pub struct AddCommentRequest {
    pub content: Option<String>,
    pub comment: Option<String>,
    pub parent_id: Option<i64>,
}

pub async fn add_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AddCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let content = payload
        .content
        .filter(|content| !content.is_empty())
        .or(payload.comment)
        .unwrap_or_default();

    let comment = CommentService::new(state.db.clone())
        .add(id, auth.user_id, &content, payload.parent_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to add comment"))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentView>,
}

pub async fn get_comments(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<CommentsResponse>, AppError> {
    let comments = CommentService::new(state.db.clone())
        .thread(id, auth.map(|user| user.user_id))
        .await
        .map_err(|err| AppError::from_service(err, "failed to list comments"))?;

    Ok(Json(CommentsResponse { comments }))
}

pub async fn comment_like_stub(Path(_id): Path<Uuid>, _auth: AuthUser) -> Result<StatusCode, AppError> {
    Err(AppError::not_implemented(
        "liking from the comments module is not implemented, use /comments/:id/like",
    ))
}

pub async fn like_comment(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CommentLikeToggle>, AppError> {
    let toggle = InteractionService::new(state.db.clone())
        .toggle_comment_like(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to toggle comment like"))?;

    Ok(Json(toggle))
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowToggle>, AppError> {
    let toggle = InteractionService::new(state.db.clone())
        .toggle_follow(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to toggle follow"))?;

    Ok(Json(toggle))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub posts: Vec<Post>,
    pub conversations: Vec<UserSummary>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    #[serde(flatten)]
    pub counts: FollowCounts,
}

pub async fn me(auth: AuthUser, State(state): State<AppState>) -> Result<Json<MeResponse>, AppError> {
    const CONTEXT: &str = "failed to load profile";
    let users = UserService::new(state.db.clone());

    let user = users
        .get_user(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let posts = PostService::new(state.db.clone())
        .list_by_author(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let conversations = ChatService::new(state.db.clone())
        .conversations(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let followers = users
        .list_followers(auth.user_id, ME_RELATION_LIMIT)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let following = users
        .list_following(auth.user_id, ME_RELATION_LIMIT)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let counts = users
        .follow_counts(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;

    Ok(Json(MeResponse {
        user: with_profile_image(&state, user),
        posts: posts.into_iter().map(|post| with_post_image(&state, post)).collect(),
        conversations: with_summary_images(&state, conversations),
        followers: with_summary_images(&state, followers),
        following: with_summary_images(&state, following),
        counts,
    }))
}

pub async fn upload_profile_image(
    auth: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<User>, AppError> {
    let limit = ImageKind::Profile.limit();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if matches!(field.name(), Some("image") | Some("profile_image")) {
            let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
            if !bytes.is_empty() {
                image = Some(bytes);
            }
        }
    }

    let key = store_image(&state, ImageKind::Profile, image)
        .await?
        .ok_or_else(|| AppError::bad_request("image is required"))?;

    let user = UserService::new(state.db.clone())
        .update_profile_image(auth.user_id, &key)
        .await
        .map_err(|err| AppError::from_service(err, "failed to update profile image"))?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(with_profile_image(&state, user)))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
    pub posts: Vec<Post>,
    pub comments: Vec<AuthoredComment>,
    pub is_following: bool,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    #[serde(flatten)]
    pub counts: FollowCounts,
}

pub async fn profile(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    const CONTEXT: &str = "failed to load profile";
    let users = UserService::new(state.db.clone());

    let target = users
        .require_by_uuid(id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let posts = PostService::new(state.db.clone())
        .list_by_author(target.id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let comments = CommentService::new(state.db.clone())
        .list_by_author(target.id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let is_following = match auth {
        Some(viewer) if viewer.user_id != target.id => users
            .is_following(viewer.user_id, target.id)
            .await
            .map_err(|err| AppError::from_service(err, CONTEXT))?,
        _ => false,
    };
    let followers = users
        .list_followers(target.id, PROFILE_RELATION_LIMIT)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let following = users
        .list_following(target.id, PROFILE_RELATION_LIMIT)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;
    let counts = users
        .follow_counts(target.id)
        .await
        .map_err(|err| AppError::from_service(err, CONTEXT))?;

    Ok(Json(ProfileResponse {
        user: with_profile_image(&state, target).into(),
        posts: posts.into_iter().map(|post| with_post_image(&state, post)).collect(),
        comments,
        is_following,
        followers: with_summary_images(&state, followers),
        following: with_summary_images(&state, following),
        counts,
    }))
}

#[derive(Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<UserSummary>,
}

pub async fn list_conversations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ConversationsResponse>, AppError> {
    let conversations = ChatService::new(state.db.clone())
        .conversations(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list conversations"))?;

    Ok(Json(ConversationsResponse {
        conversations: with_summary_images(&state, conversations),
    }))
}

pub async fn open_chat(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ChatOpened>, AppError> {
    let (target, marked_read) = ChatService::new(state.db.clone())
        .open(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to open chat"))?;

    Ok(Json(ChatOpened {
        target: with_profile_image(&state, target).into(),
        marked_read,
    }))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub struct SentMessage {
    pub success: bool,
    #[serde(flatten)]
    pub message: Message,
}

pub async fn send_message(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<SentMessage>), AppError> {
    let message = ChatService::new(state.db.clone())
        .send(auth.user_id, id, &payload.content)
        .await
        .map_err(|err| AppError::from_service(err, "failed to send message"))?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessage {
            success: true,
            message,
        }),
    ))
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

pub async fn get_messages(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = ChatService::new(state.db.clone())
        .messages(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to load messages"))?;

    Ok(Json(MessagesResponse { messages }))
}
