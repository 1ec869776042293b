use actix_web::web::{self, ServiceConfig};

use crate::handlers;

pub fn config(cfg: &mut ServiceConfig) {
    cfg.service(web::scope("/health").route("", web::get().to(handlers::health::ping)))
        .service(
            web::scope("/api/pedidos")
                .route("", web::post().to(handlers::pedidos::criar_pedido))
                .route("", web::get().to(handlers::pedidos::listar_pedidos))
                .route("/{id}", web::get().to(handlers::pedidos::buscar_pedido))
                .route("/{id}", web::put().to(handlers::pedidos::atualizar_pedido))
                .route(
                    "/{id}/status",
                    web::patch().to(handlers::pedidos::atualizar_status),
                )
                .route("/{id}", web::delete().to(handlers::pedidos::deletar_pedido)),
        );
}
