mod common;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;

use common::{address, completed_event, line, TestApp};
use storefront::domain::aggregates::Product;
use storefront::domain::value_objects::Role;

/// Puts something in the user's cart so checkout has a cart to retire.
async fn cart_id(app: &TestApp, token: &str, product: &Product) -> String {
    let (status, body) = app.post("/api/shop/cart/add", Some(token), json!({ "productId": product.id, "quantity": 1 })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["cartId"].as_str().unwrap().to_string()
}

async fn checkout(app: &TestApp, token: &str, items: Vec<Value>, cart_id: &str) -> (StatusCode, Value) {
    app.post(
        "/api/shop/order/checkout/add",
        Some(token),
        json!({ "cartItems": items, "address": address(), "totalAmount": "60.00", "cartId": cart_id }),
    )
    .await
}

#[tokio::test]
async fn test_checkout_rejects_empty_items_and_missing_address_before_gateway() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("ana", Role::Customer).await;
    let product = app.seed_product("Runner", dec!(20), None, 5).await;
    let cart = cart_id(&app, &token, &product).await;

    let (status, body) = checkout(&app, &token, vec![], &cart).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post("/api/shop/order/checkout/add", Some(&token), json!({ "cartItems": [line(&product, 1)], "totalAmount": "20", "cartId": cart }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.gateway.sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/shop/order/checkout/add", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized user! Token Not Found");
}

#[tokio::test]
async fn test_checkout_prices_sale_first_in_minor_units() {
    let app = TestApp::new();
    let (user, token) = app.seed_user("ben", Role::Customer).await;
    let product = app.seed_product("Jacket", dec!(25), None, 5).await;
    let cart = cart_id(&app, &token, &product).await;

    let items = vec![
        json!({ "productId": product.id, "title": "Jacket", "image": "", "price": "25", "salePrice": "19.995", "quantity": 2 }),
        json!({ "productId": product.id, "title": "Jacket", "image": "", "price": "19.99", "salePrice": "0", "quantity": 1 }),
    ];
    let (status, body) = checkout(&app, &token, items, &cart).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Order created successfully");
    assert_eq!(body["data"]["url"], "https://checkout.test/pay/cs_test_1");

    let requests = app.gateway.requests.lock().unwrap();
    let amounts: Vec<i64> = requests[0].line_items.iter().map(|l| l.unit_amount).collect();
    assert_eq!(amounts, vec![2000, 1999]);
    assert_eq!(requests[0].user_id, user.id);
    drop(requests);

    let order_id = body["data"]["orderId"].as_str().unwrap();
    let (_, detail) = app.get(&format!("/api/shop/order/getOrderDetails/{order_id}"), Some(&token)).await;
    assert_eq!(detail["data"]["paymentStatus"], "pending");
    assert_eq!(detail["data"]["orderStatus"], "pending");
    assert_eq!(detail["data"]["paymentId"], "cs_test_1");
}

#[tokio::test]
async fn test_completed_event_confirms_order_decrements_stock_and_clears_cart() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("cleo", Role::Customer).await;
    let shirt = app.seed_product("Shirt", dec!(20), None, 5).await;
    let cap = app.seed_product("Cap", dec!(10), Some(dec!(8)), 3).await;
    let cart = cart_id(&app, &token, &shirt).await;

    let (_, started) = checkout(&app, &token, vec![line(&shirt, 2), line(&cap, 1)], &cart).await;
    let order_id = started["data"]["orderId"].as_str().unwrap().to_string();

    let (status, body) = app.deliver(&completed_event("evt_1", "cs_test_1")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Order confirmed successfully");

    assert_eq!(app.stock_of(shirt.id).await, 3);
    assert_eq!(app.stock_of(cap.id).await, 2);

    let (_, detail) = app.get(&format!("/api/shop/order/getOrderDetails/{order_id}"), Some(&token)).await;
    assert_eq!(detail["data"]["paymentStatus"], "paid");
    assert_eq!(detail["data"]["orderStatus"], "inProcess");

    let (status, _) = app.get("/api/shop/cart/get", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redelivery_is_applied_once() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("dev", Role::Customer).await;
    let product = app.seed_product("Boot", dec!(80), None, 4).await;
    let cart = cart_id(&app, &token, &product).await;
    checkout(&app, &token, vec![line(&product, 3)], &cart).await;

    let event = completed_event("evt_7", "cs_test_1");
    let (status, _) = app.deliver(&event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(product.id).await, 1);

    let (status, body) = app.deliver(&event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event already processed");
    assert_eq!(app.stock_of(product.id).await, 1);

    // Same session under a fresh event id.
    let (status, _) = app.deliver(&completed_event("evt_8", "cs_test_1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(product.id).await, 1);
}

#[tokio::test]
async fn test_unknown_session_is_not_found_and_touches_nothing() {
    let app = TestApp::new();
    let product = app.seed_product("Sock", dec!(5), None, 9).await;

    let (status, body) = app.deliver(&completed_event("evt_1", "cs_nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Order not found");
    assert_eq!(app.stock_of(product.id).await, 9);
}

#[tokio::test]
async fn test_other_event_types_are_acknowledged_without_changes() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("eli", Role::Customer).await;
    let product = app.seed_product("Belt", dec!(15), None, 2).await;
    let cart = cart_id(&app, &token, &product).await;
    let (_, started) = checkout(&app, &token, vec![line(&product, 1)], &cart).await;
    let order_id = started["data"]["orderId"].as_str().unwrap().to_string();

    let payload = json!({ "id": "evt_3", "type": "payment_intent.created", "data": { "object": { "id": "pi_1" } } });
    let (status, body) = app.deliver(&payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event acknowledged");

    assert_eq!(app.stock_of(product.id).await, 2);
    let (_, detail) = app.get(&format!("/api/shop/order/getOrderDetails/{order_id}"), Some(&token)).await;
    assert_eq!(detail["data"]["paymentStatus"], "pending");
    let (status, _) = app.get("/api/shop/cart/get", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forged_or_missing_signature_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("fay", Role::Customer).await;
    let product = app.seed_product("Scarf", dec!(12), None, 6).await;
    let cart = cart_id(&app, &token, &product).await;
    checkout(&app, &token, vec![line(&product, 2)], &cart).await;

    let body = completed_event("evt_1", "cs_test_1").to_string();
    let now = chrono::Utc::now().timestamp();
    let forged = storefront::payments::signature::sign(body.as_bytes(), "whsec_wrong", now);
    let (status, json) = app.deliver_raw(body.clone(), Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(app.stock_of(product.id).await, 6);

    let before = app.gateway.verifications.load(Ordering::SeqCst);
    let (status, _) = app.deliver_raw(body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.gateway.verifications.load(Ordering::SeqCst), before);
    assert_eq!(app.stock_of(product.id).await, 6);
}

#[tokio::test]
async fn test_shortage_aborts_confirmation() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("gus", Role::Customer).await;
    let hat = app.seed_product("Hat", dec!(9), None, 1).await;
    let tee = app.seed_product("Tee", dec!(11), None, 10).await;
    let cart = cart_id(&app, &token, &tee).await;
    let (_, started) = checkout(&app, &token, vec![line(&hat, 2), line(&tee, 1)], &cart).await;
    let order_id = started["data"]["orderId"].as_str().unwrap().to_string();

    let (status, body) = app.deliver(&completed_event("evt_1", "cs_test_1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough stock for product: Hat");

    assert_eq!(app.stock_of(hat.id).await, 1);
    assert_eq!(app.stock_of(tee.id).await, 10);
    let (_, detail) = app.get(&format!("/api/shop/order/getOrderDetails/{order_id}"), Some(&token)).await;
    assert_eq!(detail["data"]["paymentStatus"], "pending");
}

#[tokio::test]
async fn test_orders_are_scoped_to_their_owner() {
    let app = TestApp::new();
    let (_, owner) = app.seed_user("hal", Role::Customer).await;
    let (_, other) = app.seed_user("ivy", Role::Customer).await;
    let product = app.seed_product("Glove", dec!(7), None, 3).await;
    let cart = cart_id(&app, &owner, &product).await;
    let (_, started) = checkout(&app, &owner, vec![line(&product, 1)], &cart).await;
    let order_id = started["data"]["orderId"].as_str().unwrap().to_string();

    let (status, _) = app.get(&format!("/api/shop/order/getOrderDetails/{order_id}"), Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app.get("/api/shop/order/getOrders", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["totalAmount"].as_str().map(|s| s.parse::<Decimal>().unwrap()), Some(dec!(60)));

    let (status, _) = app.get("/api/shop/order/getOrders", Some(&other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/shop/order/getOrderDetails/not-an-id", Some(&owner)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid order ID");
}
