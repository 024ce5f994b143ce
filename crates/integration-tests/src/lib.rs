//! Integration test harness for the Bazaar storefront.
//!
//! Each test starts the real router on an ephemeral port against the
//! database named by `TEST_DATABASE_URL`, with outgoing email captured in an
//! [`Outbox`]. Tests that need the database are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! Accounts and stores get unique names, so tests can share one database and
//! run in parallel.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{ServiceExt, extract::Request};
use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect::Policy};
use secrecy::SecretString;
use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

use bazaar_storefront::config::{EmailConfig, StorefrontConfig};
use bazaar_storefront::services::{EmailService, Outbox};
use bazaar_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running storefront with direct database access.
pub struct TestContext {
    pub base_url: String,
    pub pool: PgPool,
    pub outbox: Outbox,
}

impl TestContext {
    /// Migrate the test database and start a storefront on `127.0.0.1:0`.
    pub async fn start() -> Self {
        let database_url =
            std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let database_url = SecretString::from(database_url);

        let pool = bazaar_storefront::db::create_pool(&database_url)
            .await
            .expect("Failed to connect to test database");
        bazaar_storefront::MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        PostgresStore::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to create session table");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        let base_url = format!("http://{addr}");

        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let config = StorefrontConfig {
            database_url,
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            session_secret: SecretString::from("integration-test-session-secret-7f3a9c2e"),
            media_root: std::env::temp_dir().join(format!("bazaar-media-{}", Uuid::new_v4())),
            static_dir: manifest_dir.join("../storefront/static"),
            email: EmailConfig {
                from_address: "noreply@bazaar.test".to_owned(),
                smtp: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let outbox = Outbox::default();
        let email = EmailService::in_memory("noreply@bazaar.test", outbox.clone());
        let app = bazaar_storefront::build_app(AppState::new(config, pool.clone(), email), false);

        tokio::spawn(async move {
            axum::serve(
                listener,
                ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
            )
            .await
            .expect("test server failed");
        });

        Self {
            base_url,
            pool,
            outbox,
        }
    }

    /// A fresh browser: its own cookie jar, redirects not followed.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            base_url: self.base_url.clone(),
            http: Client::builder()
                .cookie_store(true)
                .redirect(Policy::none())
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Register and log in a new account with a unique username.
    pub async fn signed_in(&self, role: &str) -> (TestClient, String) {
        let client = self.client();
        let username = unique(role);
        client.register(role, &username).await;
        client.login(&username).await;
        (client, username)
    }

    pub async fn store_id(&self, name: &str) -> i32 {
        sqlx::query_scalar("SELECT id FROM bazaar.store WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("store exists")
    }

    pub async fn product_id(&self, name: &str) -> i32 {
        sqlx::query_scalar("SELECT id FROM bazaar.product WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("product exists")
    }

    pub async fn stock_of(&self, product_id: i32) -> i32 {
        sqlx::query_scalar("SELECT stock_quantity FROM bazaar.product WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .expect("product exists")
    }
}

/// An HTTP client bound to one running storefront.
pub struct TestClient {
    base_url: String,
    http: Client,
}

impl TestClient {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.http
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a page and return its body, asserting a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.expect("Failed to read body")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.http
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Response {
        self.http
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Follow a redirect response and return the target page body.
    pub async fn follow(&self, response: Response) -> String {
        let location = redirect_target(&response);
        self.page(&location).await
    }

    pub async fn register(&self, role: &str, username: &str) {
        let email = format!("{username}@example.com");
        let response = self
            .post_form(
                &format!("/register/{role}"),
                &[
                    ("username", username),
                    ("email", &email),
                    ("first_name", "Test"),
                    ("last_name", "User"),
                    ("password1", PASSWORD),
                    ("password2", PASSWORD),
                ],
            )
            .await;
        assert_eq!(redirect_target(&response), "/login", "registration of {username}");
    }

    pub async fn login(&self, username: &str) {
        let response = self
            .post_form("/login", &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login of {username}");
    }

    /// Create a store as the signed-in vendor.
    pub async fn create_store(&self, name: &str) {
        let response = self
            .post_form(
                "/vendor/stores/create",
                &[("name", name), ("description", "A test store")],
            )
            .await;
        assert_eq!(redirect_target(&response), "/vendor/stores");
    }

    /// Create a product without an image as the signed-in vendor.
    pub async fn create_product(&self, store_id: i32, name: &str, price: &str, stock: u32) {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_owned())
            .text("description", format!("{name} for testing"))
            .text("price", price.to_owned())
            .text("stock_quantity", stock.to_string())
            .text("store", store_id.to_string());
        let response = self.post_multipart("/vendor/products/create", form).await;
        assert_eq!(redirect_target(&response), "/vendor/products");
    }
}

/// The `Location` of a 303 response.
#[must_use]
pub fn redirect_target(response: &Response) -> String {
    assert_eq!(
        response.status(),
        StatusCode::SEE_OTHER,
        "expected a redirect from {}",
        response.url()
    );
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect has a Location header")
        .to_owned()
}

/// A name that no other test run will use.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
    format!("{prefix}_{suffix}")
}
