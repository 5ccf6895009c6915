use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::domain::customer::{
    Customer, CustomerError, CustomerFields, CustomerId, CustomerRepository, Customers, IdPolicy,
};
use crate::domain::Entity;

type Reply<T> = oneshot::Sender<Result<T, CustomerError>>;

enum Command {
    List {
        reply: Reply<Customers>,
    },
    Find {
        id: CustomerId,
        reply: Reply<Customer>,
    },
    Create {
        fields: CustomerFields,
        reply: Reply<Customer>,
    },
    Update {
        id: CustomerId,
        fields: CustomerFields,
        reply: Reply<Customer>,
    },
    Delete {
        id: CustomerId,
        reply: Reply<Customer>,
    },
}

/// 顧客サービス
///
/// リポジトリを専有するタスク一つに全操作を直列化する。各操作は毎回文書を読み直すので、
/// 真の状態は常にファイル側にある。
#[derive(Clone)]
pub struct CustomerService {
    _handle: Arc<JoinHandle<()>>,
    sender: mpsc::Sender<Command>,
}

impl CustomerService {
    pub fn spawn<R>(repository: R, policy: IdPolicy) -> Self
    where
        R: CustomerRepository + 'static,
    {
        let (tx_async, mut rx_async) = mpsc::channel::<Command>(100);
        let handle = tokio::spawn(async move {
            let mut store = Store { repository, policy };
            while let Some(command) = rx_async.recv().await {
                store.execute(command).await;
            }
            debug!("顧客サービスを終了しました");
        });
        Self {
            _handle: Arc::new(handle),
            sender: tx_async,
        }
    }

    /// 顧客を全件取得する
    pub async fn list(&self) -> Result<Customers, CustomerError> {
        self.request(|reply| Command::List { reply }).await
    }

    /// 顧客をIDで取得する
    pub async fn find(&self, id: CustomerId) -> Result<Customer, CustomerError> {
        self.request(|reply| Command::Find { id, reply }).await
    }

    /// 顧客を登録する
    pub async fn create(&self, fields: CustomerFields) -> Result<Customer, CustomerError> {
        self.request(|reply| Command::Create { fields, reply }).await
    }

    /// 顧客を丸ごと置き換える
    pub async fn update(
        &self,
        id: CustomerId,
        fields: CustomerFields,
    ) -> Result<Customer, CustomerError> {
        self.request(|reply| Command::Update { id, fields, reply })
            .await
    }

    /// 顧客を削除する
    pub async fn delete(&self, id: CustomerId) -> Result<Customer, CustomerError> {
        self.request(|reply| Command::Delete { id, reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, CustomerError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| CustomerError::Unavailable)?;
        rx.await.map_err(|_| CustomerError::Unavailable)?
    }
}

struct Store<R> {
    repository: R,
    policy: IdPolicy,
}

impl<R: CustomerRepository> Store<R> {
    async fn execute(&mut self, command: Command) {
        match command {
            Command::List { reply } => respond(reply, self.list().await),
            Command::Find { id, reply } => respond(reply, self.find(id).await),
            Command::Create { fields, reply } => respond(reply, self.create(fields).await),
            Command::Update { id, fields, reply } => {
                respond(reply, self.update(id, fields).await)
            }
            Command::Delete { id, reply } => respond(reply, self.delete(id).await),
        }
    }

    async fn list(&self) -> Result<Customers, CustomerError> {
        Ok(self.repository.load().await?)
    }

    async fn find(&self, id: CustomerId) -> Result<Customer, CustomerError> {
        self.repository
            .load()
            .await?
            .find(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&mut self, fields: CustomerFields) -> Result<Customer, CustomerError> {
        let mut customers = self.repository.load().await?;
        let id = match self.policy {
            IdPolicy::Length => customers.next_id(self.policy, None)?,
            IdPolicy::Sequence => {
                let last_issued = self.repository.last_issued_id().await?;
                let id = customers.next_id(self.policy, last_issued)?;
                self.repository.record_issued_id(id).await?;
                id
            }
        };
        let customer = customers.append(id, fields);
        self.repository.save(&customers).await?;
        info!("{}を登録しました: {}", Customer::ENTITY_NAME, customer.id());
        Ok(customer)
    }

    async fn update(
        &mut self,
        id: CustomerId,
        fields: CustomerFields,
    ) -> Result<Customer, CustomerError> {
        let mut customers = self.repository.load().await?;
        let customer = customers.replace(id, fields).ok_or_else(|| not_found(id))?;
        self.repository.save(&customers).await?;
        info!("{}を更新しました: {}", Customer::ENTITY_NAME, id);
        Ok(customer)
    }

    async fn delete(&mut self, id: CustomerId) -> Result<Customer, CustomerError> {
        let mut customers = self.repository.load().await?;
        if customers.find(id).is_none() {
            return Err(not_found(id));
        }
        if self.policy == IdPolicy::Sequence {
            // 削除前の最大IDを採番ファイルに残す
            let last_issued = self.repository.last_issued_id().await?;
            if let Some(max_id) = customers.max_id().filter(|max| Some(*max) > last_issued) {
                self.repository.record_issued_id(max_id).await?;
            }
        }
        let customer = customers.remove(id).ok_or_else(|| not_found(id))?;
        self.repository.save(&customers).await?;
        info!("{}を削除しました: {}", Customer::ENTITY_NAME, id);
        Ok(customer)
    }
}

fn not_found(id: CustomerId) -> CustomerError {
    CustomerError::NotFound(id.to_string())
}

fn respond<T>(reply: Reply<T>, result: Result<T, CustomerError>) {
    if reply.send(result).is_err() {
        debug!("応答先が既に閉じられています");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::DataAccessError;

    use super::*;

    #[derive(Default)]
    struct State {
        customers: Customers,
        last_issued: Option<CustomerId>,
        saves: usize,
        fail_load: bool,
        fail_save: bool,
    }

    #[derive(Clone, Default)]
    struct MemoryCustomerRepository(Arc<Mutex<State>>);

    impl MemoryCustomerRepository {
        fn seeded(names: &[&str]) -> Self {
            let repo = Self::default();
            {
                let mut state = repo.0.lock().unwrap();
                for (i, name) in names.iter().enumerate() {
                    state
                        .customers
                        .append((i as u64 + 1).into(), fields(name));
                }
            }
            repo
        }

        fn customers(&self) -> Customers {
            self.0.lock().unwrap().customers.clone()
        }

        fn saves(&self) -> usize {
            self.0.lock().unwrap().saves
        }
    }

    #[async_trait]
    impl CustomerRepository for MemoryCustomerRepository {
        async fn load(&self) -> Result<Customers, DataAccessError> {
            let state = self.0.lock().unwrap();
            if state.fail_load {
                return Err(DataAccessError::read("load failed"));
            }
            Ok(state.customers.clone())
        }

        async fn save(&mut self, customers: &Customers) -> Result<(), DataAccessError> {
            let mut state = self.0.lock().unwrap();
            if state.fail_save {
                return Err(DataAccessError::write("save failed"));
            }
            state.customers = customers.clone();
            state.saves += 1;
            Ok(())
        }

        async fn last_issued_id(&self) -> Result<Option<CustomerId>, DataAccessError> {
            Ok(self.0.lock().unwrap().last_issued)
        }

        async fn record_issued_id(&mut self, id: CustomerId) -> Result<(), DataAccessError> {
            self.0.lock().unwrap().last_issued = Some(id);
            Ok(())
        }
    }

    fn fields(name: &str) -> CustomerFields {
        CustomerFields {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_and_find() {
        let repo = MemoryCustomerRepository::seeded(&["Ana", "Bruno"]);
        let service = CustomerService::spawn(repo, IdPolicy::Sequence);

        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(
            service.find(2.into()).await.unwrap().name(),
            Some("Bruno")
        );
        assert!(matches!(
            service.find(3.into()).await,
            Err(CustomerError::NotFound(id)) if id == "3"
        ));
    }

    #[tokio::test]
    async fn test_sequential_creates() {
        for policy in [IdPolicy::Length, IdPolicy::Sequence] {
            let repo = MemoryCustomerRepository::seeded(&["Ana", "Bruno"]);
            let service = CustomerService::spawn(repo.clone(), policy);

            let first = service.create(fields("Carla")).await.unwrap();
            let second = service.create(fields("Davi")).await.unwrap();
            assert_eq!((*first.id(), *second.id()), (3, 4));
            assert_eq!(repo.customers().len(), 4);
            assert_eq!(repo.customers()[3], second);
        }
    }

    #[tokio::test]
    async fn test_create_after_delete() {
        let repo = MemoryCustomerRepository::seeded(&["Ana"]);
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Length);
        service.delete(1.into()).await.unwrap();
        assert_eq!(*service.create(fields("Bea")).await.unwrap().id(), 1);

        let repo = MemoryCustomerRepository::seeded(&["Ana"]);
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);
        service.delete(1.into()).await.unwrap();
        assert_eq!(repo.0.lock().unwrap().last_issued, Some(1.into()));
        assert_eq!(*service.create(fields("Bea")).await.unwrap().id(), 2);
    }

    #[tokio::test]
    async fn test_update() {
        let repo = MemoryCustomerRepository::seeded(&["Ana", "Bruno"]);
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);

        let updated = service
            .update(
                2.into(),
                CustomerFields {
                    phone: Some("5555".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id(), 2.into());
        assert_eq!(updated.name(), None);
        assert_eq!(repo.customers().find(2.into()), Some(&updated));
        assert_eq!(repo.saves(), 1);

        let before = repo.customers();
        assert!(matches!(
            service.update(9.into(), fields("X")).await,
            Err(CustomerError::NotFound(_))
        ));
        assert_eq!(repo.customers(), before);
        assert_eq!(repo.saves(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = MemoryCustomerRepository::seeded(&["Ana", "Bruno"]);
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);

        assert_eq!(service.delete(1.into()).await.unwrap().name(), Some("Ana"));
        assert_eq!(repo.customers().len(), 1);
        assert!(matches!(
            service.delete(1.into()).await,
            Err(CustomerError::NotFound(_))
        ));
        assert_eq!(repo.saves(), 1);
    }

    #[tokio::test]
    async fn test_storage_errors() {
        let repo = MemoryCustomerRepository::seeded(&["Ana"]);
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);

        repo.0.lock().unwrap().fail_save = true;
        assert!(matches!(
            service.create(fields("Bea")).await,
            Err(CustomerError::DataAccess(DataAccessError::WriteError(_)))
        ));
        assert_eq!(repo.customers().len(), 1);

        repo.0.lock().unwrap().fail_load = true;
        assert!(matches!(
            service.list().await,
            Err(CustomerError::DataAccess(DataAccessError::ReadError(_)))
        ));
        assert!(matches!(
            service.delete(1.into()).await,
            Err(CustomerError::DataAccess(DataAccessError::ReadError(_)))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_id_keeps_service_alive() {
        let repo = MemoryCustomerRepository::default();
        repo.0
            .lock()
            .unwrap()
            .customers
            .append(u64::MAX.into(), fields("Ana"));
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);

        assert!(matches!(
            service.create(fields("Bea")).await,
            Err(CustomerError::IdExhausted)
        ));
        assert_eq!(repo.customers().len(), 1);
        assert_eq!(repo.saves(), 0);
        assert_eq!(service.list().await.unwrap().len(), 1);
        assert_eq!(service.find(u64::MAX.into()).await.unwrap().name(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_not_lost() {
        let repo = MemoryCustomerRepository::default();
        let service = CustomerService::spawn(repo.clone(), IdPolicy::Sequence);

        let tasks = (0..20)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.create(fields(&i.to_string())).await })
            })
            .collect::<Vec<_>>();
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(*task.await.unwrap().unwrap().id());
        }
        ids.sort();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(repo.customers().len(), 20);
    }
}
