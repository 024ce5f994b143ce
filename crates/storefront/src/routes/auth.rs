//! Authentication route handlers.
//!
//! Handles login, logout, vendor and buyer registration, and password
//! resets by emailed link.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::Role;

use super::PageContext;
use crate::db::UserRepository;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::forms::{
    FormErrors, LoginForm, PasswordResetConfirmForm, PasswordResetRequestForm, RegistrationForm,
};
use crate::middleware::{clear_current_user, is_safe_next, set_current_user};
use crate::models::CurrentUser;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

/// Registration page template, shared by vendors and buyers.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub role: Role,
    pub form: RegistrationForm,
    pub errors: FormErrors,
}

impl RegisterTemplate {
    /// Form action for this role's registration page.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self.role {
            Role::Vendor => "/register/vendor",
            Role::Buyer => "/register/buyer",
        }
    }
}

/// Password reset request page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/password_reset.html")]
pub struct PasswordResetTemplate {
    pub page: PageContext,
    pub form: PasswordResetRequestForm,
    pub errors: FormErrors,
}

/// New password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/password_reset_confirm.html")]
pub struct PasswordResetConfirmTemplate {
    pub page: PageContext,
    pub token: String,
    pub errors: FormErrors,
}

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
#[instrument(skip(session))]
pub async fn login_page(session: Session, Query(query): Query<LoginQuery>) -> LoginTemplate {
    LoginTemplate {
        page: PageContext::load(&session).await,
        username: String::new(),
        next: query.next.filter(|n| is_safe_next(n)).unwrap_or_default(),
        errors: FormErrors::default(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = form.next.clone().filter(|n| is_safe_next(n));

    let mut errors = FormErrors::default();
    if form.username.trim().is_empty() {
        errors.add("username", crate::forms::REQUIRED);
    }
    if form.password.is_empty() {
        errors.add("password", crate::forms::REQUIRED);
    }

    let user = if errors.is_empty() {
        match AuthService::new(state.pool())
            .login(&form.username, &form.password)
            .await
        {
            Ok(user) => Some(user),
            Err(AuthError::InvalidCredentials) => None,
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    let Some(user) = user else {
        tracing::info!("Login failed");
        flash::push(&session, FlashMessage::error("Invalid username or password.")).await;
        return Ok(LoginTemplate {
            page: PageContext::load(&session).await,
            username: form.username.trim().to_owned(),
            next: next.unwrap_or_default(),
            errors,
        }
        .into_response());
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, &user.username);
    flash::push(
        &session,
        FlashMessage::success(format!("Welcome back, {}!", user.username)),
    )
    .await;
    tracing::info!(user_id = %user.id, "User logged in");

    let destination = next.unwrap_or_else(|| {
        if user.role.is_vendor() {
            "/vendor/dashboard".to_owned()
        } else {
            "/".to_owned()
        }
    });
    Ok(Redirect::to(&destination).into_response())
}

/// Log out and return home.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash::push(&session, FlashMessage::success("You have been logged out.")).await;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration
// =============================================================================

async fn render_register(
    session: &Session,
    role: Role,
    form: RegistrationForm,
    errors: FormErrors,
) -> RegisterTemplate {
    RegisterTemplate {
        page: PageContext::load(session).await,
        role,
        form,
        errors,
    }
}

async fn register(
    state: &AppState,
    session: &Session,
    role: Role,
    form: RegistrationForm,
) -> Result<Response, AppError> {
    let users = UserRepository::new(state.pool());
    let registration = match form.validate_unique(&users).await? {
        Ok(registration) => registration,
        Err(errors) => {
            return Ok(render_register(session, role, form, errors)
                .await
                .into_response());
        }
    };

    match AuthService::new(state.pool())
        .register(&registration, role)
        .await
    {
        Ok(_) => {
            flash::push(
                session,
                FlashMessage::success("Registration successful! Please log in."),
            )
            .await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AuthError::UserAlreadyExists) => {
            let mut errors = FormErrors::default();
            errors.add_non_field("A user with that username or email already exists.");
            Ok(render_register(session, role, form, errors)
                .await
                .into_response())
        }
        Err(AuthError::WeakPassword(problem)) => {
            let mut errors = FormErrors::default();
            errors.add("password2", problem);
            Ok(render_register(session, role, form, errors)
                .await
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the vendor registration page.
#[instrument(skip(session))]
pub async fn register_vendor_page(session: Session) -> RegisterTemplate {
    render_register(
        &session,
        Role::Vendor,
        RegistrationForm::default(),
        FormErrors::default(),
    )
    .await
}

/// Handle vendor registration.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register_vendor(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    register(&state, &session, Role::Vendor, form).await
}

/// Display the buyer registration page.
#[instrument(skip(session))]
pub async fn register_buyer_page(session: Session) -> RegisterTemplate {
    render_register(
        &session,
        Role::Buyer,
        RegistrationForm::default(),
        FormErrors::default(),
    )
    .await
}

/// Handle buyer registration.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register_buyer(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    register(&state, &session, Role::Buyer, form).await
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the password reset request page.
#[instrument(skip(session))]
pub async fn password_reset_page(session: Session) -> PasswordResetTemplate {
    PasswordResetTemplate {
        page: PageContext::load(&session).await,
        form: PasswordResetRequestForm::default(),
        errors: FormErrors::default(),
    }
}

/// Email a reset link to the account registered with the submitted address.
#[instrument(skip(state, session, form))]
pub async fn password_reset(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PasswordResetRequestForm>,
) -> Result<Response, AppError> {
    let email = match form.validate() {
        Ok(email) => email,
        Err(errors) => {
            return Ok(PasswordResetTemplate {
                page: PageContext::load(&session).await,
                form,
                errors,
            }
            .into_response());
        }
    };

    let (user, token) = match AuthService::new(state.pool())
        .issue_reset_token(&email)
        .await
    {
        Ok(issued) => issued,
        Err(AuthError::UserNotFound) => {
            flash::push(
                &session,
                FlashMessage::error("No account found with this email address."),
            )
            .await;
            return Ok(PasswordResetTemplate {
                page: PageContext::load(&session).await,
                form,
                errors: FormErrors::default(),
            }
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let reset_url = state
        .config()
        .absolute_url(&format!("/password-reset-confirm/{}/", token.token));

    if let Err(e) = state
        .email()
        .send_password_reset(&user.email, &user.username, &reset_url)
        .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        flash::push(
            &session,
            FlashMessage::error(format!("Could not send the reset email: {e}")),
        )
        .await;
        return Ok(PasswordResetTemplate {
            page: PageContext::load(&session).await,
            form,
            errors: FormErrors::default(),
        }
        .into_response());
    }

    flash::push(
        &session,
        FlashMessage::success("Password reset link sent to your email."),
    )
    .await;
    Ok(Redirect::to("/login").into_response())
}

/// Redirect for a reset token that cannot be used, with the right message.
async fn reject_reset_token(session: &Session, error: AuthError) -> Result<Response, AppError> {
    let message = match error {
        AuthError::InvalidResetToken => "Invalid reset link.",
        AuthError::ExpiredResetToken => "This reset link has expired or has already been used.",
        other => return Err(other.into()),
    };
    flash::push(session, FlashMessage::error(message)).await;
    Ok(Redirect::to("/password-reset").into_response())
}

/// Display the new password form for a valid reset link.
#[instrument(skip(state, session, token))]
pub async fn password_reset_confirm_page(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    if let Err(e) = AuthService::new(state.pool()).valid_reset_token(&token).await {
        return reject_reset_token(&session, e).await;
    }

    Ok(PasswordResetConfirmTemplate {
        page: PageContext::load(&session).await,
        token,
        errors: FormErrors::default(),
    }
    .into_response())
}

/// Set a new password from a reset link.
#[instrument(skip(state, session, token, form))]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<PasswordResetConfirmForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.pool());
    let reset_token = match auth.valid_reset_token(&token).await {
        Ok(reset_token) => reset_token,
        Err(e) => return reject_reset_token(&session, e).await,
    };

    let password = match form.validate() {
        Ok(password) => password,
        Err(errors) => {
            return Ok(PasswordResetConfirmTemplate {
                page: PageContext::load(&session).await,
                token,
                errors,
            }
            .into_response());
        }
    };

    if let Err(e) = auth.reset_password(&reset_token, &password).await {
        return reject_reset_token(&session, e).await;
    }

    flash::push(
        &session,
        FlashMessage::success("Password reset successfully! Please log in."),
    )
    .await;
    Ok(Redirect::to("/login").into_response())
}
