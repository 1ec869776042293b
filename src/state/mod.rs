use std::sync::Arc;

use actix_web::web::Data;

use crate::repositories::PedidoRepository;
use crate::uploads::{FotoStore, DEFAULT_MAX_UPLOAD_BYTES};

/// Per-request knobs the handlers need besides the stores.
#[derive(Clone)]
pub struct RequestPolicy {
    /// Base for upload URLs; falls back to the request's scheme://host.
    pub api_url: Option<String>,
    pub max_upload_bytes: usize,
    /// Off in production: 500 bodies then carry no internal detail.
    pub expose_error_details: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            api_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            expose_error_details: true,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pedidos: Arc<dyn PedidoRepository>,
    pub fotos: Arc<dyn FotoStore>,
    pub policy: RequestPolicy,
}

impl AppState {
    pub fn new<R, F>(pedidos: R, fotos: F, policy: RequestPolicy) -> Data<Self>
    where
        R: PedidoRepository + 'static,
        F: FotoStore + 'static,
    {
        Data::new(Self {
            pedidos: Arc::new(pedidos),
            fotos: Arc::new(fotos),
            policy,
        })
    }
}
