//! Account management commands.

use bazaar_core::Role;
use bazaar_storefront::db::UserRepository;
use bazaar_storefront::forms::RegistrationForm;
use bazaar_storefront::services::AuthService;

use super::{CliError, connect};

/// Account details from the command line.
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub role: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Create an account with the same rules as the registration pages.
///
/// Returns the new user's id.
pub async fn create(account: NewAccount) -> Result<i32, CliError> {
    let role: Role = account
        .role
        .parse()
        .map_err(|_| CliError::InvalidRole(account.role.clone()))?;

    let form = RegistrationForm {
        username: account.username,
        email: account.email,
        first_name: account.first_name,
        last_name: account.last_name,
        password1: account.password.clone(),
        password2: account.password,
    };

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let registration = form
        .validate_unique(&users)
        .await?
        .map_err(CliError::Validation)?;

    let user = AuthService::new(&pool).register(&registration, role).await?;

    tracing::info!(
        "Account created! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );
    Ok(user.id.as_i32())
}

/// Replace the password of an existing account.
pub async fn set_password(username: &str, password: &str) -> Result<(), CliError> {
    let pool = connect().await?;
    let user = AuthService::new(&pool).set_password(username, password).await?;

    tracing::info!("Password updated for {} (ID: {})", user.username, user.id);
    Ok(())
}
