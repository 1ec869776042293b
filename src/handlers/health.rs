use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "API está funcionando",
    }))
}
