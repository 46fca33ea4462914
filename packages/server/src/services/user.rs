use tracing::{info, warn};
use uuid::Uuid;

use super::require_len;
use crate::error::AppError;
use crate::repository::{
    NewUser, PostRepository, UserProfilePatch, UserRecord, UserRepository,
};
use crate::utils::hash;

pub const DEFAULT_LEADERBOARD_LIMIT: u64 = 50;
pub const MAX_LEADERBOARD_LIMIT: u64 = 100;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 254;
const MAX_BIO_LEN: usize = 500;
const MAX_PROFILE_IMAGE_LEN: usize = 2048;

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

/// Position in the leaderboard. Ranks are 1-based and never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUser {
    pub rank: u64,
    pub username: String,
    pub total_likes_received: i64,
    pub profile_image: String,
}

/// Outcome of rebuilding a user's `posts` back-reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub user_id: Uuid,
    /// Ids present in the post table but missing from `posts`.
    pub added: Vec<Uuid>,
    /// Ids in `posts` whose post no longer exists or belongs to someone else.
    pub removed: Vec<Uuid>,
    pub posts: Vec<Uuid>,
    pub total_likes_received: i64,
    /// Likes currently held by the user's posts. May be below
    /// `total_likes_received` when liked posts have since been deleted.
    pub likes_held: i64,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    require_len("Username", username, MIN_USERNAME_LEN, MAX_USERNAME_LEN)?;
    if !username
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits, '_' and '.'".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    require_len("Email", email, 1, MAX_EMAIL_LEN)?;
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation("Email is not valid".into())),
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_optional(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) => require_len(field, v, 0, max),
        None => Ok(()),
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    hash::hash_password(password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

pub struct UserService<'a> {
    users: &'a dyn UserRepository,
    posts: &'a dyn PostRepository,
}

impl<'a> UserService<'a> {
    pub fn new(users: &'a dyn UserRepository, posts: &'a dyn PostRepository) -> Self {
        Self { users, posts }
    }

    pub async fn register(&self, input: Registration) -> Result<UserRecord, AppError> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;
        validate_optional("Bio", input.bio.as_deref(), MAX_BIO_LEN)?;
        validate_optional(
            "Profile image",
            input.profile_image.as_deref(),
            MAX_PROFILE_IMAGE_LEN,
        )?;

        let user = self
            .users
            .insert(NewUser {
                username: input.username.trim().to_string(),
                email: input.email.trim().to_lowercase(),
                password: hash_password(&input.password)?,
                bio: input.bio.map(|b| b.trim().to_string()).unwrap_or_default(),
                profile_image: input
                    .profile_image
                    .map(|p| p.trim().to_string())
                    .unwrap_or_default(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verify credentials. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, AppError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let is_valid = hash::verify_password(password, &user.password)
            .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;
        if !is_valid {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserRecord, AppError> {
        self.users.find_by_id(id).await?.ok_or_else(user_not_found)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<UserRecord, AppError> {
        self.users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(user_not_found)
    }

    /// Apply a profile patch. Users may only edit themselves.
    pub async fn update(
        &self,
        id: Uuid,
        requester: Uuid,
        mut patch: UserProfilePatch,
    ) -> Result<UserRecord, AppError> {
        if id != requester {
            return Err(AppError::Forbidden(
                "You can only edit your own profile".into(),
            ));
        }

        if let Some(username) = patch.username.as_deref() {
            validate_username(username)?;
        }
        if let Some(email) = patch.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(password) = patch.password.as_deref() {
            validate_password(password)?;
        }
        validate_optional("Bio", patch.bio.as_deref(), MAX_BIO_LEN)?;
        validate_optional(
            "Profile image",
            patch.profile_image.as_deref(),
            MAX_PROFILE_IMAGE_LEN,
        )?;

        patch.username = patch.username.map(|u| u.trim().to_string());
        patch.email = patch.email.map(|e| e.trim().to_lowercase());
        patch.bio = patch.bio.map(|b| b.trim().to_string());
        patch.profile_image = patch.profile_image.map(|p| p.trim().to_string());
        patch.password = match patch.password {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };

        self.users
            .update_profile(id, patch)
            .await?
            .ok_or_else(user_not_found)
    }

    /// Delete one's own account. Posts and comments are left in place.
    pub async fn delete(&self, id: Uuid, requester: Uuid) -> Result<(), AppError> {
        if id != requester {
            return Err(AppError::Forbidden(
                "You can only delete your own account".into(),
            ));
        }
        if !self.users.delete(id).await? {
            return Err(user_not_found());
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub async fn leaderboard(&self, limit: u64) -> Result<Vec<RankedUser>, AppError> {
        let rows = self.users.leaderboard(limit).await?;
        Ok(rows
            .into_iter()
            .zip(1u64..)
            .map(|(row, rank)| RankedUser {
                rank,
                username: row.username,
                total_likes_received: row.total_likes_received,
                profile_image: row.profile_image,
            })
            .collect())
    }

    /// Rebuild `posts` for one user from the post table.
    ///
    /// Repairs the gaps left by best-effort appends and pulls. The like total
    /// is reported, not rewritten.
    pub async fn reconcile(&self, id: Uuid, requester: Uuid) -> Result<Reconciliation, AppError> {
        if id != requester {
            return Err(AppError::Forbidden(
                "You can only reconcile your own account".into(),
            ));
        }

        let user = self.get_by_id(id).await?;
        let summary = self.posts.author_summary(id).await?;

        let removed: Vec<Uuid> = user
            .posts
            .iter()
            .filter(|post_id| !summary.post_ids.contains(post_id))
            .copied()
            .collect();
        let added: Vec<Uuid> = summary
            .post_ids
            .iter()
            .filter(|post_id| !user.posts.contains(post_id))
            .copied()
            .collect();

        for post_id in &removed {
            self.users.pull_post(id, *post_id).await?;
        }
        for post_id in &added {
            if !self.users.push_post(id, *post_id).await? {
                return Err(user_not_found());
            }
        }

        if !added.is_empty() || !removed.is_empty() {
            warn!(
                user_id = %id,
                added = added.len(),
                removed = removed.len(),
                "Repaired post back-references"
            );
        }

        let user = self.get_by_id(id).await?;
        Ok(Reconciliation {
            user_id: id,
            added,
            removed,
            posts: user.posts,
            total_likes_received: user.total_likes_received,
            likes_held: summary.likes_held,
        })
    }
}
