use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clientes::domain::customer::CustomerError;
use serde_json::json;
use tracing::{debug, error};

pub const NOT_FOUND_MESSAGE: &str = "Cliente não encontrado";
pub const BAD_REQUEST_MESSAGE: &str = "Corpo da requisição inválido";

/// エラーが起きたエンドポイント
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Find,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// クライアントに返す固定のエラーメッセージ
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Erro ao carregar os clientes",
            Operation::Find => "Erro ao buscar o cliente",
            Operation::Create => "Erro ao criar cliente",
            Operation::Update => "Erro ao editar cliente",
            Operation::Delete => "Erro ao excluir cliente",
        }
    }
}

/// `{"error": "..."}` を返すAPIエラー。原因はログにだけ残す
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    pub fn new(operation: Operation, error: CustomerError) -> Self {
        match error {
            CustomerError::NotFound(id) => {
                debug!("{:?}: 顧客が見つかりません: {}", operation, id);
                Self::not_found()
            }
            CustomerError::DataAccess(_)
            | CustomerError::IdExhausted
            | CustomerError::Unavailable => {
                error!("{:?}: {}", operation, error);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: operation.failure_message(),
                }
            }
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: NOT_FOUND_MESSAGE,
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: BAD_REQUEST_MESSAGE,
        }
    }

    /// `map_err` にそのまま渡すためのもの
    pub fn on(operation: Operation) -> impl Fn(CustomerError) -> Self {
        move |error| Self::new(operation, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
