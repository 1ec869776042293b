use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use pedidos_api::config::Config;
use pedidos_api::repositories::sqlite::SqlitePedidoRepository;
use pedidos_api::state::{AppState, RequestPolicy};
use pedidos_api::uploads::DiskFotoStore;
use pedidos_api::{routes, MIGRATOR};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cfg = Config::from_env();

    let pool = SqlitePoolOptions::new()
        .connect(&cfg.database_url)
        .await
        .map_err(std::io::Error::other)?;

    if cfg.production {
        // Re-applying on an already-migrated database is fine; a failure
        // here must not keep the service down.
        match MIGRATOR.run(&pool).await {
            Ok(()) => info!("migrations aplicadas"),
            Err(e) => warn!(err = %e, "falha ao aplicar migrations, seguindo mesmo assim"),
        }
    }

    std::fs::create_dir_all(&cfg.upload_dir)?;

    let state = AppState::new(
        SqlitePedidoRepository::new(pool),
        DiskFotoStore::new(cfg.upload_dir.clone()),
        RequestPolicy {
            api_url: cfg.api_url.clone(),
            max_upload_bytes: cfg.max_upload_bytes,
            expose_error_details: !cfg.production,
        },
    );

    info!(addr = %cfg.bind_addr, "servidor iniciando");

    let upload_dir = cfg.upload_dir.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(routes::config)
            .service(actix_files::Files::new("/uploads", upload_dir.clone()))
    })
    .bind(cfg.bind_addr)?
    .run()
    .await
}
