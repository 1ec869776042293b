use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Enumerated on purpose: no `image/*` wildcard pass-through.
const ALLOWED_MIMES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Apenas imagens são permitidas. Tipo recebido: {0}")]
    RejectedType(String),
    #[error("Arquivo muito grande. Tamanho máximo permitido: {} MB", .limit / (1024 * 1024))]
    TooLarge { limit: usize },
    #[error("Campo de arquivo inesperado: {0}")]
    UnexpectedField(String),
    #[error("Corpo da requisição inválido")]
    MalformedBody,
    #[error("Erro ao processar o upload do arquivo")]
    Failed,
}

/// Where validated image bytes end up. The handlers only see the generated
/// file name; swapping the disk store for [`MemoryFotoStore`] keeps tests off
/// the filesystem.
#[async_trait]
pub trait FotoStore: Send + Sync {
    async fn save(&self, ext: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}

/// Writes uploads into a local directory, created on first use. Names are
/// `<uuid-v4><original extension>`, so they never collide and are never
/// reused. Nothing ever deletes them.
#[derive(Clone)]
pub struct DiskFotoStore {
    dir: PathBuf,
}

impl DiskFotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FotoStore for DiskFotoStore {
    async fn save(&self, ext: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            error!(dir = %self.dir.display(), err = %e, "falha ao criar diretório de uploads");
            return Err(UploadError::Failed);
        }
        let name = format!("{}{}", Uuid::new_v4(), ext);
        if let Err(e) = tokio::fs::write(self.dir.join(&name), &bytes).await {
            error!(file = %name, err = %e, "falha ao gravar upload");
            return Err(UploadError::Failed);
        }
        Ok(name)
    }
}

/// Keeps uploads in a map instead of on disk.
#[derive(Clone, Default)]
pub struct MemoryFotoStore {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryFotoStore {
    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl FotoStore for MemoryFotoStore {
    async fn save(&self, ext: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let name = format!("{}{}", Uuid::new_v4(), ext);
        self.inner.write().await.insert(name.clone(), bytes);
        Ok(name)
    }
}

/// A request body normalized so JSON and multipart flow through the same
/// validation: plain fields as a JSON map, plus the stored file name when the
/// request carried a `foto` file that passed the filter.
#[derive(Debug, Default)]
pub struct PedidoBody {
    pub fields: Map<String, Value>,
    pub stored_foto: Option<String>,
}

pub async fn read_pedido_body(
    req: &HttpRequest,
    payload: web::Payload,
    store: &dyn FotoStore,
    max_bytes: usize,
) -> Result<PedidoBody, UploadError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        read_multipart(Multipart::new(req.headers(), payload), store, max_bytes).await
    } else {
        read_json(payload, max_bytes).await
    }
}

async fn read_json(mut payload: web::Payload, max_bytes: usize) -> Result<PedidoBody, UploadError> {
    let mut buf = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|_| UploadError::MalformedBody)?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }
    if buf.is_empty() {
        return Ok(PedidoBody::default());
    }
    match serde_json::from_slice::<Value>(&buf) {
        Ok(Value::Object(fields)) => Ok(PedidoBody {
            fields,
            stored_foto: None,
        }),
        _ => Err(UploadError::MalformedBody),
    }
}

async fn read_multipart(
    mut parts: Multipart,
    store: &dyn FotoStore,
    max_bytes: usize,
) -> Result<PedidoBody, UploadError> {
    let mut fields = Map::new();
    let mut stored_foto = None;

    while let Some(item) = parts.next().await {
        let mut field = item.map_err(|_| UploadError::MalformedBody)?;
        let (name, filename) = {
            let cd = field.content_disposition();
            (
                cd.get_name().unwrap_or("").to_string(),
                cd.get_filename().map(str::to_string),
            )
        };

        match filename {
            Some(original) => {
                if name != "foto" {
                    return Err(UploadError::UnexpectedField(name));
                }
                let mime = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                if !ALLOWED_MIMES.contains(&mime.as_str()) {
                    return Err(UploadError::RejectedType(mime));
                }
                let bytes = read_field(&mut field, max_bytes).await?;
                stored_foto = Some(store.save(&file_ext(&original), bytes).await?);
            }
            None => {
                let bytes = read_field(&mut field, max_bytes).await?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                fields.insert(name, Value::String(text));
            }
        }
    }

    Ok(PedidoBody {
        fields,
        stored_foto,
    })
}

async fn read_field(
    field: &mut actix_multipart::Field,
    max_bytes: usize,
) -> Result<Vec<u8>, UploadError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|_| UploadError::Failed)?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn file_ext(original: &str) -> String {
    Path::new(original)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Base URL for upload links: `API_URL` when configured, otherwise derived
/// from the incoming request.
pub fn base_url(api_url: Option<&str>, req: &HttpRequest) -> String {
    match api_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

/// Absolute URLs and data-URIs pass through untouched; anything else is
/// treated as a stored file name and pointed at `/uploads`.
pub fn foto_url(base: &str, value: &str) -> String {
    if value.starts_with("http://")
        || value.starts_with("https://")
        || value.starts_with("data:image/")
    {
        value.to_string()
    } else {
        format!("{}/uploads/{}", base.trim_end_matches('/'), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foto_url_passes_absolute_urls_and_data_uris_through() {
        let base = "http://localhost:3000";
        assert_eq!(
            foto_url(base, "https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
        assert_eq!(
            foto_url(base, "data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn foto_url_prefixes_stored_names() {
        assert_eq!(
            foto_url("http://localhost:3000/", "abc.png"),
            "http://localhost:3000/uploads/abc.png"
        );
    }

    #[test]
    fn file_ext_keeps_the_original_extension() {
        assert_eq!(file_ext("festa.jpeg"), ".jpeg");
        assert_eq!(file_ext("sem-extensao"), "");
    }

    #[test]
    fn too_large_message_reports_the_limit_in_mb() {
        let err = UploadError::TooLarge {
            limit: 50 * 1024 * 1024,
        };
        assert!(err.to_string().contains("50 MB"));
    }

    #[tokio::test]
    async fn disk_store_writes_under_a_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFotoStore::new(dir.path());
        let name = store.save(".png", vec![1, 2, 3]).await.unwrap();
        assert!(name.ends_with(".png"));
        let on_disk = tokio::fs::read(dir.path().join(&name)).await.unwrap();
        assert_eq!(on_disk, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn disk_store_names_never_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFotoStore::new(dir.path());
        let a = store.save(".jpg", vec![0]).await.unwrap();
        let b = store.save(".jpg", vec![0]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryFotoStore::default();
        let name = store.save(".gif", vec![9, 9]).await.unwrap();
        assert_eq!(store.get(&name).await, Some(vec![9, 9]));
        assert_eq!(store.len().await, 1);
    }
}
