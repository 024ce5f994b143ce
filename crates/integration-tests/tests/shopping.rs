//! Integration tests for the buyer journey: cart, checkout, orders, reviews.
//!
//! Requires a `PostgreSQL` database in `TEST_DATABASE_URL`.

#![allow(clippy::expect_used)]

use bazaar_integration_tests::{TestContext, redirect_target, unique};
use reqwest::StatusCode;

/// Create a vendor, a store and one product. Returns the product name and id.
async fn stocked_product(ctx: &TestContext, price: &str, stock: u32) -> (String, i32) {
    let (vendor, _) = ctx.signed_in("vendor").await;
    let store = unique("Shop");
    let product = unique("Widget");

    vendor.create_store(&store).await;
    let store_id = ctx.store_id(&store).await;
    vendor.create_product(store_id, &product, price, stock).await;

    let id = ctx.product_id(&product).await;
    (product, id)
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_add_update_and_remove_cart_lines() {
    let ctx = TestContext::start().await;
    let (name, id) = stocked_product(&ctx, "4.00", 5).await;
    let (buyer, _) = ctx.signed_in("buyer").await;

    let response = buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    assert_eq!(redirect_target(&response), "/cart");
    let cart = buyer.follow(response).await;
    assert!(cart.contains(&format!("{name} added to cart!")));
    assert!(cart.contains("Cart (1)"));

    let response = buyer
        .post_form(&format!("/cart/update/{id}"), &[("quantity", "3")])
        .await;
    let cart = buyer.follow(response).await;
    assert!(cart.contains("Cart updated."));
    assert!(cart.contains("$12.00"));

    let response = buyer
        .post_form(&format!("/cart/update/{id}"), &[("quantity", "9")])
        .await;
    let cart = buyer.follow(response).await;
    assert!(cart.contains("Only 5 items available."));

    let response = buyer.post_form(&format!("/cart/remove/{id}"), &[]).await;
    let cart = buyer.follow(response).await;
    assert!(cart.contains(&format!("{name} removed from cart.")));
    assert!(cart.contains("Your cart is empty."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_cannot_add_more_than_stock() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "4.00", 1).await;
    let (buyer, _) = ctx.signed_in("buyer").await;

    let response = buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    assert_eq!(redirect_target(&response), "/cart");

    let response = buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    assert_eq!(redirect_target(&response), format!("/product/{id}"));
    let page = buyer.follow(response).await;
    assert!(page.contains("Only 1 items available in stock."));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_with_empty_cart() {
    let ctx = TestContext::start().await;
    let (buyer, _) = ctx.signed_in("buyer").await;

    let response = buyer.post_form("/checkout", &[]).await;
    assert_eq!(redirect_target(&response), "/cart");
    assert!(buyer.follow(response).await.contains("Your cart is empty."));
}

// ============================================================================
// Checkout & Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_places_order_and_sends_invoice() {
    let ctx = TestContext::start().await;
    let (name, id) = stocked_product(&ctx, "7.25", 3).await;
    let (buyer, username) = ctx.signed_in("buyer").await;

    buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    buyer.post_form(&format!("/cart/add/{id}"), &[]).await;

    let response = buyer.post_form("/checkout", &[]).await;
    let location = redirect_target(&response);
    assert!(location.starts_with("/order/"));

    let order_page = buyer.follow(response).await;
    assert!(order_page.contains("Order placed successfully! Invoice sent to your email."));
    assert!(order_page.contains(&name));
    assert!(order_page.contains("$14.50"));
    assert!(order_page.contains("Cart (0)"));

    assert_eq!(ctx.stock_of(id).await, 1);

    let sent = ctx.outbox.sent();
    assert_eq!(sent.len(), 1);
    let invoice = sent.first().expect("invoice");
    assert_eq!(invoice.to, format!("{username}@example.com"));
    assert!(invoice.subject.starts_with("Invoice for Order #"));
    assert!(invoice.body.contains(&format!("{name} x2")));

    let order_id: i32 = location
        .trim_start_matches("/order/")
        .parse()
        .expect("numeric order id");
    let invoice_sent: bool =
        sqlx::query_scalar("SELECT invoice_sent FROM bazaar.order WHERE id = $1")
            .bind(order_id)
            .fetch_one(&ctx.pool)
            .await
            .expect("order exists");
    assert!(invoice_sent);

    let history = buyer.page("/account/orders").await;
    assert!(history.contains(&format!("#{order_id}")));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_checkout_survives_email_failure() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "3.00", 2).await;
    let (buyer, _) = ctx.signed_in("buyer").await;
    ctx.outbox.fail_deliveries(true);

    buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    let response = buyer.post_form("/checkout", &[]).await;
    let location = redirect_target(&response);
    assert!(location.starts_with("/order/"));

    let order_page = buyer.follow(response).await;
    assert!(order_page.contains("Order placed successfully, but email could not be sent"));
    assert_eq!(ctx.stock_of(id).await, 1);
    assert!(ctx.outbox.sent().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_second_buyer_loses_the_last_unit() {
    let ctx = TestContext::start().await;
    let (name, id) = stocked_product(&ctx, "50.00", 1).await;
    let (first, _) = ctx.signed_in("buyer").await;
    let (second, _) = ctx.signed_in("buyer").await;

    first.post_form(&format!("/cart/add/{id}"), &[]).await;
    second.post_form(&format!("/cart/add/{id}"), &[]).await;

    let response = first.post_form("/checkout", &[]).await;
    assert!(redirect_target(&response).starts_with("/order/"));

    let response = second.post_form("/checkout", &[]).await;
    assert_eq!(redirect_target(&response), "/cart");
    let cart = second.follow(response).await;
    assert!(cart.contains(&format!("{name} is out of stock.")));

    assert_eq!(ctx.stock_of(id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_buyer_cannot_see_another_buyers_order() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "1.00", 5).await;
    let (owner, _) = ctx.signed_in("buyer").await;
    let (stranger, _) = ctx.signed_in("buyer").await;

    owner.post_form(&format!("/cart/add/{id}"), &[]).await;
    let response = owner.post_form("/checkout", &[]).await;
    let location = redirect_target(&response);

    assert_eq!(stranger.get(&location).await.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_review_is_verified_after_purchase() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "2.00", 5).await;
    let (buyer, username) = ctx.signed_in("buyer").await;

    buyer.post_form(&format!("/cart/add/{id}"), &[]).await;
    buyer.post_form("/checkout", &[]).await;

    let form = buyer.page(&format!("/product/{id}/review")).await;
    assert!(form.contains("verified purchase"));

    let response = buyer
        .post_form(
            &format!("/product/{id}/review"),
            &[("rating", "4"), ("comment", "Sturdy and cheerful")],
        )
        .await;
    assert_eq!(redirect_target(&response), format!("/product/{id}"));

    let page = buyer.follow(response).await;
    assert!(page.contains("Review submitted successfully!"));
    assert!(page.contains("Sturdy and cheerful"));
    assert!(page.contains(&username));
    assert!(page.contains("Verified purchase"));
    assert!(page.contains("Average rating: 4.0 / 5"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_resubmitting_review_replaces_it() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "2.00", 5).await;
    let (buyer, _) = ctx.signed_in("buyer").await;
    let path = format!("/product/{id}/review");

    buyer
        .post_form(&path, &[("rating", "2"), ("comment", "First impressions")])
        .await;
    buyer
        .post_form(&path, &[("rating", "5"), ("comment", "Grew on me")])
        .await;

    let rows: Vec<(i32, String, bool)> = sqlx::query_as(
        "SELECT rating, comment, is_verified FROM bazaar.review WHERE product_id = $1",
    )
    .bind(id)
    .fetch_all(&ctx.pool)
    .await
    .expect("reviews");
    assert_eq!(rows, vec![(5, "Grew on me".to_owned(), false)]);

    let form = buyer.page(&path).await;
    assert!(form.contains("Update your review"));
    assert!(form.contains("Grew on me"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_review_rating_out_of_range() {
    let ctx = TestContext::start().await;
    let (_, id) = stocked_product(&ctx, "2.00", 5).await;
    let (buyer, _) = ctx.signed_in("buyer").await;

    let response = buyer
        .post_form(
            &format!("/product/{id}/review"),
            &[("rating", "6"), ("comment", "Too keen")],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("Rating must be between 1 and 5."));
    assert!(body.contains("Too keen"));
}
