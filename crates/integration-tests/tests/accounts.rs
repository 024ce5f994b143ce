//! Integration tests for registration, login, role gates and password reset.
//!
//! Requires a `PostgreSQL` database in `TEST_DATABASE_URL`.

#![allow(clippy::expect_used)]

use bazaar_integration_tests::{PASSWORD, TestContext, redirect_target, unique};
use reqwest::StatusCode;

// ============================================================================
// Registration & Login
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_health_endpoints() {
    let ctx = TestContext::start().await;
    let client = ctx.client();

    let response = client.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");

    assert_eq!(client.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_register_then_login_shows_welcome() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("buyer");

    client.register("buyer", &username).await;
    let login_page = client.page("/login").await;
    assert!(login_page.contains("Registration successful! Please log in."));

    let response = client
        .post_form("/login", &[("username", &username), ("password", PASSWORD)])
        .await;
    assert_eq!(redirect_target(&response), "/");

    let home = client.follow(response).await;
    assert!(home.contains(&format!("Welcome back, {username}!")));
    assert!(home.contains("Cart (0)"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_vendor_login_lands_on_dashboard() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("vendor");

    client.register("vendor", &username).await;
    let response = client
        .post_form("/login", &[("username", &username), ("password", PASSWORD)])
        .await;

    assert_eq!(redirect_target(&response), "/vendor/dashboard");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_duplicate_username_is_rejected() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("dup");
    client.register("buyer", &username).await;

    let response = client
        .post_form(
            "/register/vendor",
            &[
                ("username", &username),
                ("email", "someone-else@example.com"),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("A user with that username already exists."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_wrong_password_rerenders_login() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("buyer");
    client.register("buyer", &username).await;

    let response = client
        .post_form("/login", &[("username", &username), ("password", "not-my-password")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("Invalid username or password."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_logout_clears_session() {
    let ctx = TestContext::start().await;
    let (client, _) = ctx.signed_in("buyer").await;

    let response = client.post_form("/logout", &[]).await;
    assert_eq!(redirect_target(&response), "/");

    let response = client.get("/cart").await;
    assert_eq!(redirect_target(&response), "/login?next=%2Fcart");
}

// ============================================================================
// Role Gates
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_anonymous_is_sent_to_login_with_next() {
    let ctx = TestContext::start().await;
    let client = ctx.client();

    let response = client.get("/vendor/dashboard").await;
    assert_eq!(redirect_target(&response), "/login?next=%2Fvendor%2Fdashboard");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_login_honours_next() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("buyer");
    client.register("buyer", &username).await;

    let response = client
        .post_form(
            "/login",
            &[
                ("username", &username),
                ("password", PASSWORD),
                ("next", "/account/orders"),
            ],
        )
        .await;
    assert_eq!(redirect_target(&response), "/account/orders");

    let response = client
        .post_form(
            "/login",
            &[
                ("username", &username),
                ("password", PASSWORD),
                ("next", "//evil.example.com"),
            ],
        )
        .await;
    assert_eq!(redirect_target(&response), "/");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_buyer_cannot_open_vendor_pages() {
    let ctx = TestContext::start().await;
    let (client, _) = ctx.signed_in("buyer").await;

    let response = client.get("/vendor/stores").await;
    assert_eq!(redirect_target(&response), "/");

    let home = client.follow(response).await;
    assert!(home.contains("Access denied. Vendor access required."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_vendor_cannot_use_cart() {
    let ctx = TestContext::start().await;
    let (client, _) = ctx.signed_in("vendor").await;

    let response = client.get("/cart").await;
    assert_eq!(redirect_target(&response), "/");

    let home = client.follow(response).await;
    assert!(home.contains("Access denied. Buyer access required."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_trailing_slash_reaches_same_page() {
    let ctx = TestContext::start().await;
    let client = ctx.client();

    let body = client.page("/login/").await;
    assert!(body.contains("Log in"));
}

// ============================================================================
// Password Reset
// ============================================================================

/// Pull the reset token out of the emailed link.
fn token_from(body: &str) -> String {
    let (_, rest) = body
        .split_once("/password-reset-confirm/")
        .expect("email contains a reset link");
    rest.chars().take_while(|c| *c != '/' && !c.is_whitespace()).collect()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_password_reset_round_trip() {
    let ctx = TestContext::start().await;
    let client = ctx.client();
    let username = unique("reset");
    let email = format!("{username}@example.com");
    client.register("buyer", &username).await;

    let response = client.post_form("/password-reset", &[("email", &email)]).await;
    assert_eq!(redirect_target(&response), "/login");

    let sent = ctx.outbox.sent();
    assert_eq!(sent.len(), 1);
    let message = sent.first().expect("one email");
    assert_eq!(message.to, email);
    let token = token_from(&message.body);

    let form_page = client.page(&format!("/password-reset-confirm/{token}/")).await;
    assert!(form_page.contains("Choose a new password"));

    let new_password = "a-brand-new-passphrase";
    let response = client
        .post_form(
            &format!("/password-reset-confirm/{token}"),
            &[("password1", new_password), ("password2", new_password)],
        )
        .await;
    assert_eq!(redirect_target(&response), "/login");

    let response = client
        .post_form("/login", &[("username", &username), ("password", new_password)])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // The link only works once.
    let response = client
        .get(&format!("/password-reset-confirm/{token}"))
        .await;
    assert_eq!(redirect_target(&response), "/password-reset");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_password_reset_unknown_email() {
    let ctx = TestContext::start().await;
    let client = ctx.client();

    let response = client
        .post_form("/password-reset", &[("email", "nobody-here@example.com")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("No account found with this email address."));
    assert!(ctx.outbox.sent().is_empty());
}
