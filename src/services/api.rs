//! Data access facade: one request function per domain operation.
//!
//! Every function builds a query, runs it against the backend, reshapes the
//! rows into model types and, on failure, logs and hands the error back to
//! the caller. Nothing is cached or retried.

use std::sync::Arc;

use chrono::Utc;
use futures::try_join;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::{Backend, SelectQuery};
use crate::config::{Config, LazyBackend};
use crate::error::{AppError, AppResult};
use crate::model::{Follow, Like, NewPost, Post, PostRow, Story, UploadedFile, User, UserProfile};
use crate::services::auth::AuthBroadcaster;
use crate::services::upload::{FileUpload, UploadService};

const AUTHOR: &str = "user:users(id, email, first_name, last_name, profile_image_url)";

fn post_select() -> String {
    format!("*, {}, likes(user_id), comments(count)", AUTHOR)
}

fn rows_into<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(AppError::from))
        .collect()
}

async fn follows(backend: &dyn Backend, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
    let pair = SelectQuery::table("follows")
        .eq("follower_id", follower_id)
        .eq("following_id", following_id);
    Ok(backend.count(&pair).await? > 0)
}

pub struct ApiService {
    backend: Arc<LazyBackend>,
    auth: Arc<AuthBroadcaster>,
    config: Arc<Config>,
}

impl ApiService {
    pub fn new(backend: Arc<LazyBackend>, auth: Arc<AuthBroadcaster>, config: Arc<Config>) -> Self {
        Self { backend, auth, config }
    }

    fn backend(&self) -> AppResult<Arc<dyn Backend>> {
        self.backend.get()
    }

    fn viewer_id(&self) -> Option<Uuid> {
        self.auth.current_user().map(|u| u.id)
    }

    fn require_viewer(&self) -> AppResult<Uuid> {
        self.viewer_id().ok_or(AppError::NotAuthenticated)
    }

    // --- Generic helpers ---

    pub async fn query(&self, query: SelectQuery) -> AppResult<Vec<Value>> {
        debug!(table = %query.table, params = ?query.to_params(), "query");
        let result: AppResult<_> = async { self.backend()?.select(&query).await }.await;
        result.inspect_err(|e| error!(table = %query.table, error = %e, "Query error"))
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert(&self, table: &str, row: Value) -> AppResult<Value> {
        let result: AppResult<_> = async { self.backend()?.insert(table, row, "*").await }.await;
        result.inspect_err(|e| error!(table, error = %e, "Insert error"))
    }

    pub async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value> {
        let result: AppResult<_> = async { self.backend()?.update(table, id, patch).await }.await;
        result.inspect_err(|e| error!(table, %id, error = %e, "Update error"))
    }

    pub async fn delete(&self, table: &str, id: Uuid) -> AppResult<()> {
        let result: AppResult<_> = async { self.backend()?.delete(&SelectQuery::table(table).eq("id", id)).await }.await;
        result.inspect_err(|e| error!(table, %id, error = %e, "Delete error"))
    }

    // --- Posts ---

    /// Newest first, optionally limited to one author.
    pub async fn get_posts(&self, user_id: Option<Uuid>) -> AppResult<Vec<Post>> {
        let result: AppResult<_> = async {
            let mut query = SelectQuery::table("posts").select(post_select()).order("created_at", false);
            if let Some(id) = user_id {
                query = query.eq("user_id", id);
            }
            let rows: Vec<PostRow> = rows_into(self.backend()?.select(&query).await?)?;
            let viewer = self.viewer_id();
            Ok(rows.into_iter().map(|row| Post::from_row(row, viewer)).collect())
        }
        .await;
        result.inspect_err(|e| error!(operation = "get_posts", error = %e, "Error fetching posts"))
    }

    pub async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let result: AppResult<_> = async {
            let user_id = self.require_viewer()?;
            let row = json!({
                "image_url": post.image_url,
                "caption": post.caption.filter(|c| !c.trim().is_empty()),
                "user_id": user_id,
            });
            let returning = format!("*, {}", AUTHOR);
            let created: PostRow = serde_json::from_value(self.backend()?.insert("posts", row, &returning).await?)?;
            info!(post_id = %created.id, "Post created");
            Ok(Post::from_row(created, Some(user_id)))
        }
        .await;
        result.inspect_err(|e| error!(operation = "create_post", error = %e, "Error creating post"))
    }

    pub async fn like_post(&self, post_id: Uuid) -> AppResult<()> {
        let result: AppResult<_> = async {
            let user_id = self.require_viewer()?;
            let backend = self.backend()?;
            let existing = SelectQuery::table("likes").eq("post_id", post_id).eq("user_id", user_id);
            if backend.count(&existing).await? > 0 {
                return Err(AppError::AlreadyLiked);
            }
            let like = serde_json::to_value(Like { post_id, user_id })?;
            backend.insert("likes", like, "post_id, user_id").await?;
            Ok(())
        }
        .await;
        result.inspect_err(|e| error!(operation = "like_post", %post_id, error = %e, "Error liking post"))
    }

    pub async fn unlike_post(&self, post_id: Uuid) -> AppResult<()> {
        let result: AppResult<_> = async {
            let user_id = self.require_viewer()?;
            let query = SelectQuery::table("likes").eq("post_id", post_id).eq("user_id", user_id);
            self.backend()?.delete(&query).await
        }
        .await;
        result.inspect_err(|e| error!(operation = "unlike_post", %post_id, error = %e, "Error unliking post"))
    }

    // --- Users ---

    /// All users, newest first; a non-empty `search` matches names or email.
    pub async fn get_users(&self, search: &str) -> AppResult<Vec<User>> {
        let result: AppResult<_> = async {
            let mut query = SelectQuery::table("users").order("created_at", false);
            let search = search.trim();
            if !search.is_empty() {
                query = query.or_ilike(&["first_name", "last_name", "email"], search);
            }
            rows_into(self.backend()?.select(&query).await?)
        }
        .await;
        result.inspect_err(|e| error!(operation = "get_users", error = %e, "Error fetching users"))
    }

    /// The user row plus post/follower/following counts and the viewer's follow flag.
    ///
    /// The four reads run concurrently and are not a consistent snapshot.
    pub async fn get_user_profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let result: AppResult<_> = async {
            let backend = self.backend()?;
            let rows = backend.select(&SelectQuery::table("users").eq("id", user_id).single()).await?;
            let user: User = rows
                .into_iter()
                .next()
                .map(serde_json::from_value)
                .transpose()?
                .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

            let posts = SelectQuery::table("posts").eq("user_id", user_id);
            let followers = SelectQuery::table("follows").eq("following_id", user_id);
            let following = SelectQuery::table("follows").eq("follower_id", user_id);
            let viewer = self.viewer_id().filter(|v| *v != user_id);
            let is_following = async {
                match viewer {
                    Some(viewer) => follows(backend.as_ref(), viewer, user_id).await,
                    None => Ok(false),
                }
            };

            let (posts_count, followers_count, following_count, is_following) = try_join!(
                backend.count(&posts),
                backend.count(&followers),
                backend.count(&following),
                is_following,
            )?;

            Ok(UserProfile { user, posts_count, followers_count, following_count, is_following })
        }
        .await;
        result.inspect_err(|e| error!(operation = "get_user_profile", %user_id, error = %e, "Error fetching user profile"))
    }

    pub async fn follow_user(&self, user_id: Uuid) -> AppResult<()> {
        let result: AppResult<_> = async {
            let follower_id = self.require_viewer()?;
            if follower_id == user_id {
                return Err(AppError::Validation("You cannot follow yourself".to_string()));
            }
            let backend = self.backend()?;
            if follows(backend.as_ref(), follower_id, user_id).await? {
                return Err(AppError::AlreadyFollowing);
            }
            let follow = serde_json::to_value(Follow { follower_id, following_id: user_id })?;
            backend.insert("follows", follow, "follower_id, following_id").await?;
            Ok(())
        }
        .await;
        result.inspect_err(|e| error!(operation = "follow_user", %user_id, error = %e, "Error following user"))
    }

    pub async fn unfollow_user(&self, user_id: Uuid) -> AppResult<()> {
        let result: AppResult<_> = async {
            let follower_id = self.require_viewer()?;
            let query = SelectQuery::table("follows")
                .eq("follower_id", follower_id)
                .eq("following_id", user_id);
            self.backend()?.delete(&query).await
        }
        .await;
        result.inspect_err(|e| error!(operation = "unfollow_user", %user_id, error = %e, "Error unfollowing user"))
    }

    // --- Stories ---

    /// Stories that have not expired yet, newest first.
    pub async fn get_stories(&self) -> AppResult<Vec<Story>> {
        let result: AppResult<_> = async {
            let query = SelectQuery::table("stories")
                .select(format!("*, {}", AUTHOR))
                .gte("expires_at", Utc::now().to_rfc3339())
                .order("created_at", false);
            rows_into(self.backend()?.select(&query).await?)
        }
        .await;
        result.inspect_err(|e| error!(operation = "get_stories", error = %e, "Error fetching stories"))
    }

    // --- Files ---

    /// Validates, then stores the file under a fresh name and returns its public URL.
    pub async fn upload_file(&self, file: &FileUpload) -> AppResult<UploadedFile> {
        let result: AppResult<_> = async {
            let errors = UploadService::validate_file(Some(file), &self.config);
            if !errors.is_empty() {
                return Err(AppError::UploadRejected(errors));
            }
            let backend = self.backend()?;
            let name = UploadService::generate_file_name(
                file.extension(),
                Utc::now().timestamp_millis(),
                &mut rand::thread_rng(),
            );
            let path = UploadService::storage_path(&self.config, &name);
            let bucket = &self.config.storage_bucket;
            backend.upload(bucket, &path, file.bytes.clone(), &file.content_type).await?;
            let url = backend.public_url(bucket, &path);
            info!(%path, size = file.size, "File uploaded");
            Ok(UploadedFile { url, path })
        }
        .await;
        result.inspect_err(|e| error!(operation = "upload_file", file = %file.name, error = %e, "Error uploading file"))
    }
}
