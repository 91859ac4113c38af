//! API Integration Tests over the in-memory backend

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;

use common::{create_product, memory_app, send};

#[tokio::test]
async fn test_health_and_banner() {
    let (app, _) = memory_app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK", "message": "API Running"}));

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "storefront_checkout");
}

#[tokio::test]
async fn test_request_id_is_assigned() {
    let (app, _) = memory_app();

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "client-supplied")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "client-supplied");
}

#[tokio::test]
async fn test_checkout_e2e() {
    let (app, store) = memory_app();
    let product_id = create_product(&app, "Kopi", 10000, 3).await;

    // 1. Successful checkout
    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [{"product_id": product_id, "quantity": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Checkout failed: {}", body);
    assert_eq!(body["total_amount"], 20000);
    assert_eq!(body["details"][0]["product_name"], "Kopi");
    assert_eq!(body["details"][0]["subtotal"], 20000);
    let transaction_id = body["id"].as_i64().unwrap();

    // 2. Stock decremented
    let (status, body) = send(&app, "GET", &format!("/api/products/{}", product_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 1);

    // 3. Second checkout runs out of stock
    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [{"product_id": product_id, "quantity": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "insufficient_stock");
    assert_eq!(store.stock_of(product_id), Some(1));

    // 4. Transaction is readable
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/transactions/{}", transaction_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_validation_errors() {
    let (app, _) = memory_app();
    let product_id = create_product(&app, "Teh", 5000, 10).await;

    let (status, body) = send(&app, "POST", "/api/checkout", Some(json!({"items": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "empty_order");

    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [{"product_id": product_id, "quantity": 0}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_quantity");

    let (status, body) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [{"product_id": 999, "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "product_not_found");

    // Malformed JSON
    let req = Request::builder()
        .method("POST")
        .uri("/api/checkout")
        .header("content-type", "application/json")
        .body(Body::from("{\"items\": [oops]"))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error_code"], "invalid_request");

    let (status, body) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_multi_item_checkout_is_atomic() {
    let (app, store) = memory_app();
    let kopi = create_product(&app, "Kopi", 15000, 10).await;
    let roti = create_product(&app, "Roti", 8000, 1).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [
            {"product_id": kopi, "quantity": 3},
            {"product_id": roti, "quantity": 2}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.stock_of(kopi), Some(10));
    assert_eq!(store.stock_of(roti), Some(1));
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_transaction_not_found() {
    let (app, _) = memory_app();

    let (status, body) = send(&app, "GET", "/api/transactions/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "not_found");
}

#[tokio::test]
async fn test_category_crud() {
    let (app, _) = memory_app();

    // 1. Create
    let (status, body) = send(
        &app,
        "POST",
        "/api/categories",
        Some(json!({"name": "Minuman", "description": "Drinks"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["id"].as_i64().unwrap();

    // 2. Name is required
    let (status, _) = send(&app, "POST", "/api/categories", Some(json!({"name": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 3. Update
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/categories/{}", category_id),
        Some(json!({"name": "Beverages", "description": "Cold and hot"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Beverages");

    // 4. In-use category cannot be deleted
    let (status, product) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({"name": "Es Teh", "price": 3000, "stock": 5, "category_id": category_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["category_name"], "Beverages");

    let (status, body) = send(&app, "DELETE", &format!("/api/categories/{}", category_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "still_referenced");

    // 5. Delete after the product is gone
    let product_uri = format!("/api/products/{}", product["id"]);
    let (status, _) = send(&app, "DELETE", &product_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &format!("/api/categories/{}", category_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/categories/{}", category_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_validation_and_filters() {
    let (app, _) = memory_app();
    create_product(&app, "Kopi Susu", 18000, 5).await;
    create_product(&app, "Teh Manis", 5000, 5).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({"name": "Broken", "price": -1, "stock": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({"name": "Kopi Hitam", "price": 12000, "stock": 0, "active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["active"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(json!({"name": "Orphan", "price": 1, "stock": 1, "category_id": 77})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "missing_reference");

    let (status, body) = send(&app, "GET", "/api/products?name=KOPI", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/products?name=kopi&active=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Kopi Susu"]);

    let (status, _) = send(&app, "GET", "/api/products?active=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_restock_and_sold_product_delete() {
    let (app, store) = memory_app();
    let product_id = create_product(&app, "Gula", 2000, 1).await;
    let uri = format!("/api/products/{}", product_id);

    let (status, _) = send(
        &app,
        "POST",
        "/api/checkout",
        Some(json!({"items": [{"product_id": product_id, "quantity": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Restock through PUT
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({"name": "Gula Pasir", "price": 2500, "stock": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 20);
    assert_eq!(store.stock_of(product_id), Some(20));

    // Sold line items keep their snapshot
    let (_, transactions) = send(&app, "GET", "/api/transactions", None).await;
    assert_eq!(transactions[0]["details"][0]["product_name"], "Gula");
    assert_eq!(transactions[0]["total_amount"], 2000);

    // A product referenced by sales cannot be deleted
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "PUT", "/api/products/9999", Some(json!({"name": "X", "price": 1, "stock": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_http_checkouts_never_oversell() {
    let (app, store) = memory_app();
    let product_id = create_product(&app, "Limited", 1000, 5).await;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                send(
                    &app,
                    "POST",
                    "/api/checkout",
                    Some(json!({"items": [{"product_id": product_id, "quantity": 1}]})),
                )
                .await
                .0
            })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::UNPROCESSABLE_ENTITY => rejected += 1,
            other => panic!("Unexpected status: {}", other),
        }
    }

    assert_eq!(created, 5);
    assert_eq!(rejected, 15);
    assert_eq!(store.stock_of(product_id), Some(0));
}
