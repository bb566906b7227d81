//! User operations using Diesel

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::Sqlite;
use serde::Deserialize;

use super::diesel_schema::users;
use super::models::{current_timestamp, NewUser, User, UserRole};
use super::query::Page;
use crate::error::{ArchiveError, ConflictKind};

/// Input for creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub institution_id: i32,
}

/// Query parameters for listing users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub institution_id: Option<i32>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Compose the WHERE clause for a user listing
pub fn filtered(query: &UserQuery) -> users::BoxedQuery<'static, Sqlite> {
    let mut base_query = users::table.into_boxed();

    if let Some(institution_id) = query.institution_id {
        base_query = base_query.filter(users::institution_id.eq(institution_id));
    }

    if let Some(role) = query.role {
        base_query = base_query.filter(users::role.eq(role.as_str()));
    }

    base_query
}

/// Get user by ID
pub fn get_user(conn: &mut SqliteConnection, id: i32) -> Result<Option<User>, ArchiveError> {
    users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .optional()
        .map_err(|e| ArchiveError::query("User lookup failed", e))
}

/// Get user by (globally unique) email
pub fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, ArchiveError> {
    users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .optional()
        .map_err(|e| ArchiveError::query("User lookup by email failed", e))
}

/// List users, ordered by id
pub fn list_users(
    conn: &mut SqliteConnection,
    query: &UserQuery,
    page: Page,
) -> Result<Vec<User>, ArchiveError> {
    filtered(query)
        .order(users::id.asc())
        .limit(page.limit)
        .offset(page.offset)
        .select(User::as_select())
        .load(conn)
        .map_err(|e| ArchiveError::query("User list failed", e))
}

/// Insert a user and return the stored row
///
/// A UNIQUE violation on email surfaces as a conflict, covering writers that
/// raced past the duplicate-email check.
pub fn insert_user(
    conn: &mut SqliteConnection,
    input: &CreateUserInput,
) -> Result<User, ArchiveError> {
    let now = current_timestamp();
    let new_user = NewUser {
        email: &input.email,
        name: &input.name,
        role: input.role.as_str(),
        institution_id: input.institution_id,
        created_at: &now,
        updated_at: &now,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ArchiveError::Conflict(ConflictKind::DuplicateEmail(input.email.clone()))
            }
            other => ArchiveError::query("User insert failed", other),
        })
}
