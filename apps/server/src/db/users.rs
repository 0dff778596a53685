//! Database operations for users.

use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{GoogleProfile, User, UserRole};

/// Find or create a user from a verified Google profile.
///
/// A single `INSERT ... ON CONFLICT (google_id) DO UPDATE`, so concurrent
/// first sign-ins of the same account converge on one row. Profile fields
/// and the last login are refreshed on every sign-in. `grant_admin` promotes
/// the account; an existing admin is never demoted here.
pub async fn upsert_from_profile(
    db: &DatabaseConnection,
    profile: &GoogleProfile,
    grant_admin: bool,
) -> AppResult<User> {
    use crate::entity::user::{ActiveModel, Column, Entity};
    use sea_orm::sea_query::OnConflict;

    let now = Utc::now();
    let role = if grant_admin {
        UserRole::Admin
    } else {
        UserRole::Citizen
    };

    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        google_id: Set(profile.id().to_string()),
        email: Set(profile.email().to_string()),
        full_name: Set(profile.full_name().to_string()),
        avatar_url: Set(profile.avatar_url().to_string()),
        role: Set(role.as_str().to_string()),
        last_login_at: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Entity::insert(model)
        .on_conflict(upsert_conflict(grant_admin))
        .exec_without_returning(db)
        .await?;

    let stored = Entity::find()
        .filter(Column::GoogleId.eq(profile.id()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch upserted user".to_string()))?;

    Ok(model_to_user(stored))
}

/// Columns refreshed when the account already exists. The role is only
/// overwritten when promoting.
fn upsert_conflict(grant_admin: bool) -> sea_orm::sea_query::OnConflict {
    use crate::entity::user::Column;

    let mut columns = vec![
        Column::Email,
        Column::FullName,
        Column::AvatarUrl,
        Column::LastLoginAt,
    ];
    if grant_admin {
        columns.push(Column::Role);
    }

    sea_orm::sea_query::OnConflict::column(Column::GoogleId)
        .update_columns(columns)
        .to_owned()
}

/// Find a user by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<User>> {
    let result = crate::entity::user::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(model_to_user))
}

/// List all users, newest first.
pub async fn list(db: &DatabaseConnection) -> AppResult<Vec<User>> {
    let users = crate::entity::user::Entity::find()
        .order_by_desc(crate::entity::user::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(users.into_iter().map(model_to_user).collect())
}

/// Set the role of the user with the given email (case-insensitive).
///
/// Returns false if no such user exists.
pub async fn set_role_by_email(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
) -> AppResult<bool> {
    use sea_orm::sea_query::{Expr, Func};

    let result = crate::entity::user::Entity::update_many()
        .col_expr(
            crate::entity::user::Column::Role,
            Expr::value(role.as_str().to_string()),
        )
        .filter(
            Expr::expr(Func::lower(Expr::col(crate::entity::user::Column::Email)))
                .eq(email.to_lowercase()),
        )
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

fn model_to_user(m: crate::entity::user::Model) -> User {
    User {
        id: m.id,
        google_id: m.google_id,
        email: m.email,
        full_name: m.full_name,
        avatar_url: m.avatar_url,
        role: UserRole::parse(&m.role).unwrap_or_default(),
        last_login_at: m.last_login_at,
        created_at: m.created_at,
    }
}
