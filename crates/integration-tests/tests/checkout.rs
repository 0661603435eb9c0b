//! Checkout wizard flows for a verified customer.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use thrivo_integration_tests::{TestServer, location};

const CUSTOMER: [(&str, &str); 4] = [
    ("name", "Sana Malik"),
    ("phone", "03331234567"),
    ("address", "12 Canal Road"),
    ("city", "Lahore"),
];

async fn verified_server(email: &str) -> TestServer {
    let server = TestServer::start().await;
    server.sign_up_verified(email).await;
    server
}

/// Walk product 1 to the payment step.
async fn reach_payment(server: &TestServer) {
    assert_eq!(server.get("/buy/1").await.status(), StatusCode::OK);
    server.post("/buy/1/continue", &[]).await;
    let response = server.post("/buy/1/customer", &CUSTOMER).await;
    assert_eq!(location(&response).as_deref(), Some("/buy/1"));
}

#[tokio::test]
async fn test_full_checkout_with_prepaid_method() {
    let server = verified_server("buyer@example.com").await;

    assert_eq!(location(&server.get("/buy").await).as_deref(), Some("/buy/1"));

    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Product Details"));
    assert!(page.contains("Premium Protein Mix"));
    assert!(page.contains("PKR 2,700"));

    let response = server.post("/buy/1/quantity", &[("op", "increment")]).await;
    assert_eq!(location(&response).as_deref(), Some("/buy/1"));
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("PKR 5,200"));

    server.post("/buy/1/continue", &[]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Customer Information"));
    assert!(page.contains("buyer@example.com"));
    assert!(page.contains("All fields are required"));
    for field in [
        r#"name="name" value="" autocomplete="name" required"#,
        r#"name="phone" value="" autocomplete="tel" required"#,
        r#"autocomplete="street-address" required"#,
        r#"name="city" value="" autocomplete="address-level2" required"#,
    ] {
        assert!(page.contains(field), "{field}");
    }

    // Missing city keeps the visitor on step 2 with their input.
    server.post("/buy/1/customer", &CUSTOMER[..3]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Please fill in: City"));
    assert!(page.contains("Customer Information"));
    assert!(page.contains("Sana Malik"));

    server.post("/buy/1/customer", &CUSTOMER).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Payment Method"));

    // Placing without a method is refused.
    server.post("/buy/1/place", &[]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Please select a payment method"));

    server.post("/buy/1/payment", &[("method", "jazzcash")]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("03001234567"));
    assert!(page.contains("PKR 5,200"));

    server.post("/buy/1/place", &[("transaction_id", "")]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Please enter the transaction ID"));

    let response = server
        .post("/buy/1/place", &[("transaction_id", "JC-778812")])
        .await;
    assert_eq!(location(&response).as_deref(), Some("/buy/1"));

    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Order Placed Successfully!"));
    assert!(page.contains("JC-778812"));
    assert!(page.contains("PKR 5,200"));
    assert!(page.contains(r#"<p class="reference">TH"#));

    // The confirmation is shown once; the next visit starts over.
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Product Details"));
    assert!(page.contains("PKR 2,700"));
}

#[tokio::test]
async fn test_cash_on_delivery_needs_no_transaction_id() {
    let server = verified_server("cod@example.com").await;
    reach_payment(&server).await;

    server.post("/buy/1/payment", &[("method", "cod")]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("in cash when your order arrives"));
    assert!(!page.contains("Transaction ID"));

    server.post("/buy/1/place", &[]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Order Placed Successfully!"));
    assert!(page.contains("Cash on Delivery"));
}

#[tokio::test]
async fn test_back_navigation_keeps_input() {
    let server = verified_server("back@example.com").await;
    reach_payment(&server).await;

    server.post("/buy/1/back", &[]).await;
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Customer Information"));
    assert!(page.contains("12 Canal Road"));

    server.post("/buy/1/back", &[]).await;
    assert!(server.get_text("/buy/1").await.contains("Product Details"));

    // Back from the first step leaves the wizard.
    let response = server.post("/buy/1/back", &[]).await;
    assert_eq!(location(&response).as_deref(), Some("/products"));
}

#[tokio::test]
async fn test_quantity_never_drops_below_one() {
    let server = verified_server("qty@example.com").await;
    server.get_text("/buy/2").await;

    server.post("/buy/2/quantity", &[("op", "decrement")]).await;
    let page = server.get_text("/buy/2").await;
    assert!(page.contains("Energy Protein Bars"));
    assert!(page.contains(r#"<span class="quantity__value">1</span>"#));
    assert!(page.contains("PKR 2,000"));
}

#[tokio::test]
async fn test_leaving_the_wizard_discards_the_draft() {
    let server = verified_server("leave@example.com").await;
    reach_payment(&server).await;

    assert_eq!(server.get("/products").await.status(), StatusCode::OK);
    let page = server.get_text("/buy/1").await;
    assert!(page.contains("Product Details"));
}

#[tokio::test]
async fn test_switching_product_starts_a_new_draft() {
    let server = verified_server("switch@example.com").await;
    reach_payment(&server).await;

    let page = server.get_text("/buy/2").await;
    assert!(page.contains("Product Details"));
    assert!(page.contains("Energy Protein Bars"));

    // Actions for the abandoned product do nothing but reopen its wizard.
    let response = server.post("/buy/1/continue", &[]).await;
    assert_eq!(location(&response).as_deref(), Some("/buy/1"));
}

#[tokio::test]
async fn test_unknown_products_and_methods() {
    let server = verified_server("lost@example.com").await;

    assert_eq!(server.get("/buy/99").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/buy/abc").await.status(), StatusCode::NOT_FOUND);

    reach_payment(&server).await;
    let response = server.post("/buy/1/payment", &[("method", "bitcoin")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
