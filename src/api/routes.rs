//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{
    Category, CategoryId, CheckoutItem, NewCategory, NewProduct, Product, ProductFilter,
    ProductId, Transaction, TransactionId,
};
use crate::error::{AppError, AppResult};
use crate::handlers::CheckoutCommand;
use crate::store::{CategoryRepository, ProductRepository};

use super::state::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
}

impl From<CheckoutRequest> for CheckoutCommand {
    fn from(request: CheckoutRequest) -> Self {
        CheckoutCommand::new(request.items)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Categories
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        // Products
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        // Checkout & transactions
        .route("/checkout", axum::routing::post(checkout))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:id", get(get_transaction))
}

/// Service banner
pub async fn index() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/api/categories", "/api/products", "/api/checkout", "/api/transactions"],
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "API Running",
    })
}

// =========================================================================
// Categories
// =========================================================================

async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.find_all().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> AppResult<Json<Category>> {
    let category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))?;

    Ok(Json(category))
}

async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let Json(request) = payload?;
    request.validate().map_err(AppError::InvalidRequest)?;

    let category = state.categories.create(&request).await?;
    tracing::info!(category_id = category.id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> AppResult<Json<Category>> {
    let Json(request) = payload?;
    request.validate().map_err(AppError::InvalidRequest)?;

    let category = state
        .categories
        .update(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))?;

    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> AppResult<StatusCode> {
    if !state.categories.delete(id).await? {
        return Err(AppError::NotFound(format!("Category {}", id)));
    }

    tracing::info!(category_id = id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Products
// =========================================================================

async fn list_products(
    State(state): State<AppState>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> AppResult<Json<Vec<Product>>> {
    let Query(filter) = filter?;
    Ok(Json(state.products.find_all(&filter).await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> AppResult<Json<Product>> {
    let product = state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;

    Ok(Json(product))
}

async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let Json(request) = payload?;
    request.validate().map_err(AppError::InvalidRequest)?;

    let product = state.products.create(&request).await?;
    tracing::info!(product_id = product.id, stock = product.stock, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product, including its stock level (restock)
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> AppResult<Json<Product>> {
    let Json(request) = payload?;
    request.validate().map_err(AppError::InvalidRequest)?;

    let product = state
        .products
        .update(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;

    tracing::info!(product_id = id, stock = product.stock, "Product updated");
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> AppResult<StatusCode> {
    if !state.products.delete(id).await? {
        return Err(AppError::NotFound(format!("Product {}", id)));
    }

    tracing::info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Checkout & transactions
// =========================================================================

async fn checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Transaction>)> {
    let Json(request) = payload?;

    let transaction = state.transactions.checkout(request.into()).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn list_transactions(State(state): State<AppState>) -> AppResult<Json<Vec<Transaction>>> {
    Ok(Json(state.transactions.list_transactions().await?))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> AppResult<Json<Transaction>> {
    let transaction = state
        .transactions
        .get_transaction(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {}", id)))?;

    Ok(Json(transaction))
}
