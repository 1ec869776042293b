use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use tracing::error;

use crate::entities::pedido::{NewPedido, PedidoChanges};
use crate::errors::{ApiError, RepoError};
use crate::state::AppState;
use crate::uploads;

const MSG_CAMPOS_OBRIGATORIOS: &str = "Campos obrigatórios: cliente, tipo, qtd";
const MSG_QTD_INVALIDA: &str = "A quantidade deve ser um número positivo";
const MSG_DATA_INVALIDA: &str = "Data inválida";

pub async fn criar_pedido(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let body = uploads::read_pedido_body(
        &req,
        payload,
        state.fotos.as_ref(),
        state.policy.max_upload_bytes,
    )
    .await?;
    let fields = &body.fields;

    let cliente = truthy_string(fields, "cliente");
    let tipo = truthy_string(fields, "tipo");
    let qtd_present = fields.get("qtd").map(is_truthy).unwrap_or(false);
    let (cliente, tipo) = match (cliente, tipo, qtd_present) {
        (Some(c), Some(t), true) => (c, t),
        _ => return Err(ApiError::BadRequest(MSG_CAMPOS_OBRIGATORIOS.into())),
    };
    let qtd = fields
        .get("qtd")
        .and_then(parse_qtd)
        .filter(|q| *q > 0)
        .ok_or_else(|| ApiError::BadRequest(MSG_QTD_INVALIDA.into()))?;

    let data = match fields.get("data").filter(|v| is_truthy(v)) {
        Some(v) => parse_data(v).ok_or_else(|| ApiError::BadRequest(MSG_DATA_INVALIDA.into()))?,
        None => Utc::now(),
    };

    // Uploaded file wins over an inline foto value in the body.
    let base = uploads::base_url(state.policy.api_url.as_deref(), &req);
    let foto = match body.stored_foto {
        Some(name) => Some(uploads::foto_url(&base, &name)),
        None => truthy_string(fields, "foto").map(|v| uploads::foto_url(&base, &v)),
    };

    let new = NewPedido {
        cliente,
        data,
        tipo,
        qtd,
        desc: truthy_string(fields, "desc"),
        status: truthy_string(fields, "status").unwrap_or_else(|| "pendente".into()),
        resumo: truthy_string(fields, "resumo"),
        foto,
    };

    let pedido = state
        .pedidos
        .create(new)
        .await
        .map_err(|e| store_failure(&state, "Erro ao criar pedido", e))?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Pedido criado com sucesso",
        "pedido": pedido,
    })))
}

pub async fn listar_pedidos(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let pedidos = state
        .pedidos
        .list()
        .await
        .map_err(|e| store_failure(&state, "Erro ao listar pedidos", e))?;
    Ok(HttpResponse::Ok().json(pedidos))
}

pub async fn buscar_pedido(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let pedido = state
        .pedidos
        .get_by_id(id)
        .await
        .map_err(|e| store_failure(&state, "Erro ao buscar pedido", e))?;
    Ok(HttpResponse::Ok().json(pedido))
}

pub async fn atualizar_pedido(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let body = uploads::read_pedido_body(
        &req,
        payload,
        state.fotos.as_ref(),
        state.policy.max_upload_bytes,
    )
    .await?;
    let fields = &body.fields;

    // Merge semantics: only fields present in the request touch the row.
    // desc/resumo/foto go by key presence so a null or empty value clears.
    let mut changes = PedidoChanges {
        cliente: truthy_string(fields, "cliente"),
        tipo: truthy_string(fields, "tipo"),
        status: truthy_string(fields, "status"),
        ..PedidoChanges::default()
    };
    if let Some(v) = fields.get("data").filter(|v| is_truthy(v)) {
        changes.data =
            Some(parse_data(v).ok_or_else(|| ApiError::BadRequest(MSG_DATA_INVALIDA.into()))?);
    }
    if let Some(v) = fields.get("qtd").filter(|v| is_truthy(v)) {
        let qtd = parse_qtd(v)
            .filter(|q| *q > 0)
            .ok_or_else(|| ApiError::BadRequest(MSG_QTD_INVALIDA.into()))?;
        changes.qtd = Some(qtd);
    }
    if fields.contains_key("desc") {
        changes.desc = Some(truthy_string(fields, "desc"));
    }
    if fields.contains_key("resumo") {
        changes.resumo = Some(truthy_string(fields, "resumo"));
    }

    let base = uploads::base_url(state.policy.api_url.as_deref(), &req);
    if let Some(name) = body.stored_foto {
        changes.foto = Some(Some(uploads::foto_url(&base, &name)));
    } else if fields.contains_key("foto") {
        changes.foto = Some(truthy_string(fields, "foto").map(|v| uploads::foto_url(&base, &v)));
    }

    let pedido = state
        .pedidos
        .update(id, changes)
        .await
        .map_err(|e| store_failure(&state, "Erro ao atualizar pedido", e))?;
    Ok(HttpResponse::Ok().json(pedido))
}

pub async fn atualizar_status(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    // An empty body reads as an empty object, like the create/update paths.
    let fields = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(m)) => m,
            _ => return Err(ApiError::BadRequest("Corpo da requisição inválido".into())),
        }
    };
    let status = truthy_string(&fields, "status")
        .ok_or_else(|| ApiError::BadRequest("Campo obrigatório: status".into()))?;

    let pedido = state
        .pedidos
        .update(id, PedidoChanges::status_only(status))
        .await
        .map_err(|e| store_failure(&state, "Erro ao atualizar status do pedido", e))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Status atualizado com sucesso",
        "pedido": pedido,
    })))
}

pub async fn deletar_pedido(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state
        .pedidos
        .delete(id)
        .await
        .map_err(|e| store_failure(&state, "Erro ao deletar pedido", e))?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Pedido deletado com sucesso",
        "id": id,
    })))
}

fn store_failure(state: &AppState, message: &str, err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::NotFound,
        RepoError::Database(e) => {
            error!(err = %e, "{message}");
            let details = state
                .policy
                .expose_error_details
                .then(|| e.to_string());
            ApiError::internal(message, details)
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn value_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().map(|f| f != 0.0).unwrap_or(true) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_string)
}

fn parse_qtd(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn parse_data(v: &Value) -> Option<DateTime<Utc>> {
    let s = v.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    None
}
