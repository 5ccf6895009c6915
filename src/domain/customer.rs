use async_trait::async_trait;
use derive_more::{Deref, Display, From};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{DataAccessError, Entity, Id};

/// 顧客リポジトリ
///
/// 顧客コレクションは常にまとめて読み込み、まとめて書き戻す。
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 顧客コレクション全体を読み込む
    async fn load(&self) -> Result<Customers, DataAccessError>;
    /// 顧客コレクション全体を上書き保存する
    async fn save(&mut self, customers: &Customers) -> Result<(), DataAccessError>;
    /// 最後に発行した顧客IDを取得する
    async fn last_issued_id(&self) -> Result<Option<CustomerId>, DataAccessError>;
    /// 発行した顧客IDを記録する
    async fn record_issued_id(&mut self, id: CustomerId) -> Result<(), DataAccessError>;
}

/// 顧客ID
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Deref,
    Default,
)]
pub struct CustomerId(u64);

impl Id for CustomerId {
    type Inner = u64;
}

/// 顧客IDの採番方式
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// 件数 + 1。削除後に既存IDと衝突しうる
    Length,
    /// 発行済みIDの最大値 + 1。一度発行したIDは再利用しない
    #[default]
    Sequence,
}

/// 顧客の属性。未指定の項目は保存されず、値は型を問わずそのまま保存される
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFields {
    #[serde(
        rename = "nome",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<Value>,
    #[serde(
        rename = "endereco",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Value>,
    #[serde(
        rename = "cep",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub postal_code: Option<Value>,
    #[serde(
        rename = "data_nascimento",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<Value>,
    #[serde(
        rename = "telefone",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Value>,
}

/// キーがあれば `null` も値として残す
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// 顧客エンティティ
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "cliente_id")]
    id: CustomerId,
    #[serde(flatten)]
    fields: CustomerFields,
    /// 文書にあった未知の項目。書き戻し時もそのまま残す
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Customer {
    pub fn new(id: CustomerId, fields: CustomerFields) -> Self {
        Self {
            id,
            fields,
            extra: Map::new(),
        }
    }

    pub fn fields(&self) -> &CustomerFields {
        &self.fields
    }

    #[cfg(test)]
    pub fn name(&self) -> Option<&str> {
        self.fields.name.as_ref().and_then(Value::as_str)
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    const ENTITY_NAME: &'static str = "cliente";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// 顧客コレクション。並び順は保存順
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, From, Deref)]
#[serde(transparent)]
pub struct Customers(Vec<Customer>);

impl Customers {
    pub fn find(&self, id: CustomerId) -> Option<&Customer> {
        self.0.iter().find(|c| c.id == id)
    }

    fn position(&self, id: CustomerId) -> Option<usize> {
        self.0.iter().position(|c| c.id == id)
    }

    pub fn max_id(&self) -> Option<CustomerId> {
        self.0.iter().map(|c| c.id).max()
    }

    pub fn next_id(
        &self,
        policy: IdPolicy,
        last_issued: Option<CustomerId>,
    ) -> Result<CustomerId, CustomerError> {
        let base = match policy {
            IdPolicy::Length => self.0.len() as u64,
            IdPolicy::Sequence => self.max_id().max(last_issued).map_or(0, |id| *id),
        };
        base.checked_add(1)
            .map(CustomerId::from)
            .ok_or(CustomerError::IdExhausted)
    }

    pub fn append(&mut self, id: CustomerId, fields: CustomerFields) -> Customer {
        let customer = Customer::new(id, fields);
        self.0.push(customer.clone());
        customer
    }

    /// 最初に一致した顧客を丸ごと置き換える。IDは引数のものを保ち、未知の項目も捨てる
    pub fn replace(&mut self, id: CustomerId, fields: CustomerFields) -> Option<Customer> {
        let index = self.position(id)?;
        let customer = Customer::new(id, fields);
        self.0[index] = customer.clone();
        Some(customer)
    }

    /// 最初に一致した顧客を一件だけ取り除く
    pub fn remove(&mut self, id: CustomerId) -> Option<Customer> {
        self.position(id).map(|index| self.0.remove(index))
    }
}

#[derive(Error, Debug)]
pub enum CustomerError {
    #[error("Customer not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
    #[error("Customer id space is exhausted")]
    IdExhausted,
    #[error("Customer service is unavailable")]
    Unavailable,
}
