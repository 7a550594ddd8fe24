//! User repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use bazaar_core::{Email, Role, User, UserId};

use super::RepositoryError;
use crate::models::{NewUser, ProfileUpdate};

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new buyer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user by exact email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with the stored password hash, for login.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Find the user whose email and security answer both match exactly.
    async fn find_by_email_and_answer(
        &self,
        email: &Email,
        answer: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Replace the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Apply a partial profile update and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    phone: String,
    address: String,
    dob: NaiveDate,
    role: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = Role::from_code(row.role).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid role in database: {}", row.role))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            phone: row.phone,
            address: row.address,
            dob: row.dob,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL`-backed [`UserRepository`].
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (name, email, password_hash, phone, address, answer, dob)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, email, phone, address, dob, role, created_at, updated_at
            ",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.answer)
        .bind(user.dob)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "email already exists"))?;

        row.try_into()
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, phone, address, dob, role, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, phone, address, dob, role, created_at, updated_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, name, email, phone, address, dob, role, created_at, updated_at,
                   password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn find_by_email_and_answer(
        &self,
        email: &Email,
        answer: &str,
    ) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, phone, address, dob, role, created_at, updated_at
            FROM users
            WHERE email = $1 AND answer = $2
            ",
        )
        .bind(email.as_str())
        .bind(answer)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, phone, address, dob, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET role = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, phone, address, dob, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(role.code())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }
}
