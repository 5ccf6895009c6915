use std::path::PathBuf;

use async_trait::async_trait;
use tokio::{fs, io};

use crate::domain::customer::{CustomerId, CustomerRepository, Customers};
use crate::domain::DataAccessError;
use crate::infrastructure::sequence_path;

/// JSONファイル一つに顧客コレクションを保存するリポジトリ
///
/// 書き込みは一時ファイルを経由しない上書きなので、途中で落ちると文書が壊れうる。
#[derive(Clone, Debug)]
pub struct JsonFileCustomerRepository {
    path: PathBuf,
    sequence_path: PathBuf,
}

impl JsonFileCustomerRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sequence_path = sequence_path(&path);
        Self {
            path,
            sequence_path,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CustomerRepository for JsonFileCustomerRepository {
    async fn load(&self) -> Result<Customers, DataAccessError> {
        let data = fs::read(&self.path).await.map_err(DataAccessError::read)?;
        serde_json::from_slice(&data).map_err(DataAccessError::read)
    }

    async fn save(&mut self, customers: &Customers) -> Result<(), DataAccessError> {
        let data = serde_json::to_vec_pretty(customers).map_err(DataAccessError::write)?;
        fs::write(&self.path, data)
            .await
            .map_err(DataAccessError::write)
    }

    async fn last_issued_id(&self) -> Result<Option<CustomerId>, DataAccessError> {
        match fs::read_to_string(&self.sequence_path).await {
            Ok(s) => s
                .trim()
                .parse::<u64>()
                .map(|id| Some(id.into()))
                .map_err(DataAccessError::read),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DataAccessError::read(e)),
        }
    }

    async fn record_issued_id(&mut self, id: CustomerId) -> Result<(), DataAccessError> {
        fs::write(&self.sequence_path, id.to_string())
            .await
            .map_err(DataAccessError::write)
    }
}
