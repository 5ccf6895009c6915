//! 顧客API
//!
//! ```text
//! GET    /clientes
//! GET    /clientes/:id
//! POST   /clientes      {"nome", "endereco", "cep", "data_nascimento", "telefone"}
//! PUT    /clientes/:id  {"nome", "endereco", "cep", "data_nascimento", "telefone"}
//! DELETE /clientes/:id
//! ```
//!
//! `:id` は先頭の数字だけを読む (`/clientes/1abc` は顧客1)。

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use clientes::{
    domain::{
        customer::{Customer, CustomerId, Customers},
        Id,
    },
    service::CustomerService,
};

use crate::{
    error::{ApiError, Operation},
    extract::FieldsBody,
};

pub fn router(service: CustomerService) -> Router {
    Router::new()
        .route("/clientes", get(list).post(create))
        .route("/clientes/:id", get(find).put(update).delete(delete))
        .with_state(service)
}

/// 数値として読めないIDはどの顧客にも一致しない
fn customer_id(raw: &str) -> Result<CustomerId, ApiError> {
    CustomerId::parse(raw).ok_or_else(ApiError::not_found)
}

async fn list(State(service): State<CustomerService>) -> Result<Json<Customers>, ApiError> {
    service
        .list()
        .await
        .map(Json)
        .map_err(ApiError::on(Operation::List))
}

async fn find(
    State(service): State<CustomerService>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    service
        .find(customer_id(&id)?)
        .await
        .map(Json)
        .map_err(ApiError::on(Operation::Find))
}

async fn create(
    State(service): State<CustomerService>,
    FieldsBody(fields): FieldsBody,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = service
        .create(fields)
        .await
        .map_err(ApiError::on(Operation::Create))?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update(
    State(service): State<CustomerService>,
    Path(id): Path<String>,
    FieldsBody(fields): FieldsBody,
) -> Result<Json<Customer>, ApiError> {
    service
        .update(customer_id(&id)?, fields)
        .await
        .map(Json)
        .map_err(ApiError::on(Operation::Update))
}

async fn delete(
    State(service): State<CustomerService>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service
        .delete(customer_id(&id)?)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(ApiError::on(Operation::Delete))
}
