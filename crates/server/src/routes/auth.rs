//! Account, session and order-history handlers under `/api/v1/auth`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bazaar_core::{Email, Order, OrderId, OrderStatus, User, UserSummary};

use super::extract::{AppJson, AppPath, present, required};
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{NewUser, ProfileUpdate};
use crate::services::auth::{MIN_PASSWORD_LENGTH, verify_password};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration body. Every field is required; they are optional here so
/// the handler can name the first one missing.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub answer: Option<String>,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Password reset body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
    pub answer: Option<String>,
    pub new_password: Option<String>,
}

/// Profile update body. `email` is accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Order status body.
#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: &'static str,
    pub updated_user: User,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let name = required(body.name, "Name")?;
    let email = required(body.email, "Email")?;
    let password = required(body.password, "Password")?;
    let phone = required(body.phone, "Phone")?;
    let address = required(body.address, "Address")?;
    let dob = required(body.dob, "Date of birth")?;
    let answer = required(body.answer, "Answer")?;

    let email = Email::parse(&email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
    let dob = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest("Date of birth must be a date (YYYY-MM-DD)".to_string())
    })?;

    if state.repos().users.get_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "Already registered, please login".to_string(),
        ));
    }

    let password_hash = state.auth().hash_password(&password)?;
    let user = state
        .repos()
        .users
        .create(&NewUser {
            name,
            email,
            password_hash,
            phone,
            address,
            dob,
            answer,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        AppJson(RegisterResponse {
            success: true,
            message: "User registered successfully",
            user,
        }),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<AppJson<LoginResponse>> {
    let (Some(email), Some(password)) = (present(body.email), present(body.password)) else {
        return Err(AppError::BadRequest("Invalid email or password".to_string()));
    };

    let not_registered = || AppError::NotFound("Email is not registered".to_string());
    let email = Email::parse(&email).map_err(|_| not_registered())?;
    let (user, password_hash) = state
        .repos()
        .users
        .get_password_hash(&email)
        .await?
        .ok_or_else(not_registered)?;

    if !verify_password(&password, &password_hash)? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let token = state.auth().signer.issue(user.id)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(AppJson(LoginResponse {
        success: true,
        message: "Login successfully",
        user: UserSummary::from(&user),
        token,
    }))
}

/// `POST /forgot-password`
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(body): AppJson<ForgotPasswordRequest>,
) -> Result<AppJson<MessageResponse>> {
    let email = required(body.email, "Email")?;
    let answer = required(body.answer, "Answer")?;
    let new_password = required(body.new_password, "New password")?;

    let wrong = || AppError::NotFound("Wrong email or answer".to_string());
    let email = Email::parse(&email).map_err(|_| wrong())?;
    let user = state
        .repos()
        .users
        .find_by_email_and_answer(&email, &answer)
        .await?
        .ok_or_else(wrong)?;

    let password_hash = state.auth().hash_password(&new_password)?;
    state
        .repos()
        .users
        .update_password(user.id, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(AppJson(MessageResponse {
        success: true,
        message: "Password reset successfully",
    }))
}

/// `GET /test`
pub async fn protected_test() -> &'static str {
    "Protected Routes"
}

/// `GET /user-auth` and `GET /admin-auth`; the guards do the work.
pub async fn auth_ok() -> AppJson<OkResponse> {
    AppJson(OkResponse { ok: true })
}

/// `PUT /update-profile`
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<AppJson<UpdateProfileResponse>> {
    let password_hash = match present(body.password) {
        Some(password) if password.chars().count() < MIN_PASSWORD_LENGTH => {
            return Err(AppError::BadRequest(format!(
                "Password is required and must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        Some(password) => Some(state.auth().hash_password(&password)?),
        None => None,
    };

    let update = ProfileUpdate {
        name: present(body.name),
        password_hash,
        phone: present(body.phone),
        address: present(body.address),
    };
    let updated_user = state
        .repos()
        .users
        .update_profile(claims.id, &update)
        .await?;

    Ok(AppJson(UpdateProfileResponse {
        success: true,
        message: "Profile updated successfully",
        updated_user,
    }))
}

/// `GET /orders`
pub async fn orders(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<AppJson<Vec<Order>>> {
    let orders = state.repos().orders.list_for_buyer(claims.id).await?;
    Ok(AppJson(orders))
}

/// `GET /all-orders`
pub async fn all_orders(State(state): State<AppState>) -> Result<AppJson<Vec<Order>>> {
    let orders = state.repos().orders.list_all().await?;
    Ok(AppJson(orders))
}

/// `PUT /order-status/{order_id}`
pub async fn order_status(
    State(state): State<AppState>,
    AppPath(order_id): AppPath<OrderId>,
    AppJson(body): AppJson<OrderStatusRequest>,
) -> Result<AppJson<Order>> {
    let status = body
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<OrderStatus>()
        .map_err(|_| {
            let allowed: Vec<&str> = OrderStatus::ALL.iter().map(|s| s.as_str()).collect();
            AppError::BadRequest(format!("Status must be one of: {}", allowed.join(", ")))
        })?;

    let order = state
        .repos()
        .orders
        .update_status(order_id, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Order not found".to_string()),
            other => other.into(),
        })?;

    tracing::info!(order_id = %order_id, status = %status, "Order status updated");
    Ok(AppJson(order))
}
