use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use catalog_api::{ApiError, ApiResult};
use catalog_core::{
    CoreError, NewProduct, Page, ProductId, ProductWithRating, Review, ReviewId, ReviewInput,
};
use serde::Serialize;

use crate::manager::CatalogError;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    id: i64,
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Storage(e) => ApiError::from(e),
            CatalogError::Cancelled => ApiError::service_unavailable(err.to_string()),
        }
    }
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

// ---- Products ----

pub async fn list_products(
    State(state): State<AppState>,
    page: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<ProductWithRating>>> {
    let cancel = state.shutdown.child_token();
    let products = state.manager.list_products(query(page)?, &cancel).await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let product = body(payload)?;
    product.validate()?;
    let id = state.manager.create_product(&product).await?;
    let location = format!("/products/{id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreatedResponse { id: id.get() }),
    ))
}

pub async fn get_product(
    State(state): State<AppState>,
    product_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ProductWithRating>> {
    let product_id = parse_id::<ProductId>(path(product_id)?)?;
    let cancel = state.shutdown.child_token();
    state
        .manager
        .get_product(product_id, &cancel)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("product not found: {product_id}")))
}

pub async fn update_product(
    State(state): State<AppState>,
    product_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let product_id = parse_id::<ProductId>(path(product_id)?)?;
    let product = body(payload)?;
    product.validate()?;
    state.manager.update_product(product_id, &product).await?;
    Ok(StatusCode::OK)
}

pub async fn delete_product(
    State(state): State<AppState>,
    product_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let product_id = parse_id::<ProductId>(path(product_id)?)?;
    state.manager.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Reviews ----

pub async fn list_reviews(
    State(state): State<AppState>,
    product_id: Result<Path<i64>, PathRejection>,
    page: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<Review>>> {
    let product_id = parse_id::<ProductId>(path(product_id)?)?;
    let cancel = state.shutdown.child_token();
    let reviews = state
        .manager
        .list_reviews(product_id, query(page)?, &cancel)
        .await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    product_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let product_id = parse_id::<ProductId>(path(product_id)?)?;
    let review = body(payload)?;
    review.validate()?;
    let review_id = state.manager.create_review(product_id, &review).await?;
    let location = format!("/products/{product_id}/reviews/{review_id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreatedResponse { id: review_id.get() }),
    ))
}

pub async fn get_review(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<Json<Review>> {
    let (product_id, review_id) = path(ids)?;
    let product_id = parse_id::<ProductId>(product_id)?;
    let review_id = parse_id::<ReviewId>(review_id)?;
    let cancel = state.shutdown.child_token();
    state
        .manager
        .get_review(product_id, review_id, &cancel)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("review not found: {review_id}")))
}

pub async fn update_review(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let (product_id, review_id) = path(ids)?;
    let product_id = parse_id::<ProductId>(product_id)?;
    let review_id = parse_id::<ReviewId>(review_id)?;
    let review = body(payload)?;
    review.validate()?;
    state
        .manager
        .update_review(product_id, review_id, &review)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_review(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let (product_id, review_id) = path(ids)?;
    let product_id = parse_id::<ProductId>(product_id)?;
    let review_id = parse_id::<ReviewId>(review_id)?;
    state.manager.delete_review(product_id, review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Helpers ----

fn parse_id<T>(raw: i64) -> ApiResult<T>
where
    T: TryFrom<i64, Error = catalog_core::IdError>,
{
    T::try_from(raw).map_err(|e| ApiError::from(CoreError::from(e)))
}

fn path<T>(extracted: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    extracted
        .map(|Path(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    extracted
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
