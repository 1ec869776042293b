pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::entities::pedido::{NewPedido, Pedido, PedidoChanges};
use crate::errors::RepoError;

/// Persistence boundary for pedidos. No business validation happens here;
/// handlers hand this layer already-coerced values.
#[async_trait]
pub trait PedidoRepository: Send + Sync {
    async fn create(&self, new: NewPedido) -> Result<Pedido, RepoError>;
    /// All pedidos, newest `data` first.
    async fn list(&self) -> Result<Vec<Pedido>, RepoError>;
    async fn get_by_id(&self, id: i64) -> Result<Pedido, RepoError>;
    /// Merge update: applies only the fields set in `changes` as a single
    /// conditional statement. An empty change set returns the row unchanged.
    async fn update(&self, id: i64, changes: PedidoChanges) -> Result<Pedido, RepoError>;
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}
