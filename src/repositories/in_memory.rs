use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entities::pedido::{NewPedido, Pedido, PedidoChanges};
use crate::errors::RepoError;
use crate::repositories::PedidoRepository;

#[derive(Default)]
struct Inner {
    seq: i64,
    map: HashMap<i64, Pedido>,
}

/// HashMap-backed repository. The production binary runs on sqlite; this one
/// backs the integration tests and local experiments.
#[derive(Clone, Default)]
pub struct InMemoryPedidoRepository {
    inner: Arc<RwLock<Inner>>,
}

fn apply(pedido: &mut Pedido, changes: PedidoChanges) {
    if let Some(cliente) = changes.cliente {
        pedido.cliente = cliente;
    }
    if let Some(data) = changes.data {
        pedido.data = data;
    }
    if let Some(tipo) = changes.tipo {
        pedido.tipo = tipo;
    }
    if let Some(qtd) = changes.qtd {
        pedido.qtd = qtd;
    }
    if let Some(desc) = changes.desc {
        pedido.desc = desc;
    }
    if let Some(status) = changes.status {
        pedido.status = status;
    }
    if let Some(resumo) = changes.resumo {
        pedido.resumo = resumo;
    }
    if let Some(foto) = changes.foto {
        pedido.foto = foto;
    }
}

#[async_trait]
impl PedidoRepository for InMemoryPedidoRepository {
    async fn create(&self, new: NewPedido) -> Result<Pedido, RepoError> {
        let mut w = self.inner.write().await;
        w.seq += 1;
        let pedido = Pedido {
            id: w.seq,
            cliente: new.cliente,
            data: new.data,
            tipo: new.tipo,
            qtd: new.qtd,
            desc: new.desc,
            status: new.status,
            resumo: new.resumo,
            foto: new.foto,
        };
        w.map.insert(pedido.id, pedido.clone());
        Ok(pedido)
    }

    async fn list(&self) -> Result<Vec<Pedido>, RepoError> {
        let r = self.inner.read().await;
        let mut items: Vec<Pedido> = r.map.values().cloned().collect();
        items.sort_by(|a, b| b.data.cmp(&a.data));
        Ok(items)
    }

    async fn get_by_id(&self, id: i64) -> Result<Pedido, RepoError> {
        let r = self.inner.read().await;
        r.map.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn update(&self, id: i64, changes: PedidoChanges) -> Result<Pedido, RepoError> {
        let mut w = self.inner.write().await;
        let pedido = w.map.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply(pedido, changes);
        Ok(pedido.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut w = self.inner.write().await;
        w.map.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}
