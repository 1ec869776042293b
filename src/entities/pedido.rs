use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pedido row as stored and as serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pedido {
    pub id: i64,
    pub cliente: String,
    pub data: DateTime<Utc>,
    pub tipo: String,
    pub qtd: i64,
    pub desc: Option<String>,
    pub status: String,
    pub resumo: Option<String>,
    pub foto: Option<String>,
}

/// Attributes for a new pedido, already validated and defaulted by the
/// handler layer (`status` = "pendente", `data` = now when omitted).
#[derive(Debug, Clone)]
pub struct NewPedido {
    pub cliente: String,
    pub data: DateTime<Utc>,
    pub tipo: String,
    pub qtd: i64,
    pub desc: Option<String>,
    pub status: String,
    pub resumo: Option<String>,
    pub foto: Option<String>,
}

/// Sparse change set for a merge update: `None` leaves the column untouched.
/// The nullable columns use `Some(None)` to clear to NULL.
#[derive(Debug, Clone, Default)]
pub struct PedidoChanges {
    pub cliente: Option<String>,
    pub data: Option<DateTime<Utc>>,
    pub tipo: Option<String>,
    pub qtd: Option<i64>,
    pub desc: Option<Option<String>>,
    pub status: Option<String>,
    pub resumo: Option<Option<String>>,
    pub foto: Option<Option<String>>,
}

impl PedidoChanges {
    pub fn status_only(status: String) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cliente.is_none()
            && self.data.is_none()
            && self.tipo.is_none()
            && self.qtd.is_none()
            && self.desc.is_none()
            && self.status.is_none()
            && self.resumo.is_none()
            && self.foto.is_none()
    }
}
