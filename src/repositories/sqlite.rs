use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::entities::pedido::{NewPedido, Pedido, PedidoChanges};
use crate::errors::RepoError;
use crate::repositories::PedidoRepository;

// "desc" needs quoting, it is a SQL keyword.
const COLUMNS: &str = r#"id, cliente, data, tipo, qtd, "desc", status, resumo, foto"#;

/// sqlx-backed repository over the `pedidos` table. The pool is built at
/// startup and injected here; this type never reaches for globals.
#[derive(Clone)]
pub struct SqlitePedidoRepository {
    pool: SqlitePool,
}

impl SqlitePedidoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PedidoRepository for SqlitePedidoRepository {
    async fn create(&self, new: NewPedido) -> Result<Pedido, RepoError> {
        let sql = format!(
            r#"INSERT INTO pedidos (cliente, data, tipo, qtd, "desc", status, resumo, foto)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING {COLUMNS}"#
        );
        let pedido = sqlx::query_as::<_, Pedido>(&sql)
            .bind(new.cliente)
            .bind(new.data)
            .bind(new.tipo)
            .bind(new.qtd)
            .bind(new.desc)
            .bind(new.status)
            .bind(new.resumo)
            .bind(new.foto)
            .fetch_one(&self.pool)
            .await?;
        Ok(pedido)
    }

    async fn list(&self) -> Result<Vec<Pedido>, RepoError> {
        let sql = format!("SELECT {COLUMNS} FROM pedidos ORDER BY data DESC");
        let items = sqlx::query_as::<_, Pedido>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn get_by_id(&self, id: i64) -> Result<Pedido, RepoError> {
        let sql = format!("SELECT {COLUMNS} FROM pedidos WHERE id = ?");
        sqlx::query_as::<_, Pedido>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, id: i64, changes: PedidoChanges) -> Result<Pedido, RepoError> {
        if changes.is_empty() {
            return self.get_by_id(id).await;
        }

        // One conditional UPDATE; a row deleted concurrently just comes back
        // as zero rows instead of racing a separate existence check.
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE pedidos SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(cliente) = changes.cliente {
                set.push("cliente = ").push_bind_unseparated(cliente);
            }
            if let Some(data) = changes.data {
                set.push("data = ").push_bind_unseparated(data);
            }
            if let Some(tipo) = changes.tipo {
                set.push("tipo = ").push_bind_unseparated(tipo);
            }
            if let Some(qtd) = changes.qtd {
                set.push("qtd = ").push_bind_unseparated(qtd);
            }
            if let Some(desc) = changes.desc {
                set.push(r#""desc" = "#).push_bind_unseparated(desc);
            }
            if let Some(status) = changes.status {
                set.push("status = ").push_bind_unseparated(status);
            }
            if let Some(resumo) = changes.resumo {
                set.push("resumo = ").push_bind_unseparated(resumo);
            }
            if let Some(foto) = changes.foto {
                set.push("foto = ").push_bind_unseparated(foto);
            }
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {COLUMNS}"));

        qb.build_query_as::<Pedido>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM pedidos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection, or every pooled connection gets its own ":memory:" db.
    async fn test_repo() -> SqlitePedidoRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::MIGRATOR.run(&pool).await.unwrap();
        SqlitePedidoRepository::new(pool)
    }

    fn new_pedido(cliente: &str, day: u32) -> NewPedido {
        NewPedido {
            cliente: cliente.to_string(),
            data: Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap(),
            tipo: "bolo".into(),
            qtd: 3,
            desc: Some("sem lactose".into()),
            status: "pendente".into(),
            resumo: None,
            foto: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_round_trips() {
        let repo = test_repo().await;
        let created = repo.create(new_pedido("Ana", 1)).await.unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.cliente, "Ana");
        assert_eq!(fetched.qtd, 3);
        assert_eq!(fetched.desc.as_deref(), Some("sem lactose"));
        assert_eq!(fetched.status, "pendente");
        assert_eq!(fetched.data, created.data);
    }

    #[tokio::test]
    async fn list_orders_by_data_descending() {
        let repo = test_repo().await;
        repo.create(new_pedido("Ana", 3)).await.unwrap();
        repo.create(new_pedido("Bia", 9)).await.unwrap();
        repo.create(new_pedido("Cris", 5)).await.unwrap();

        let items = repo.list().await.unwrap();
        let clientes: Vec<&str> = items.iter().map(|p| p.cliente.as_str()).collect();
        assert_eq!(clientes, vec!["Bia", "Cris", "Ana"]);
    }

    #[tokio::test]
    async fn update_merges_and_clears() {
        let repo = test_repo().await;
        let created = repo.create(new_pedido("Ana", 1)).await.unwrap();

        let changes = PedidoChanges {
            status: Some("concluido".into()),
            desc: Some(None),
            ..PedidoChanges::default()
        };
        let updated = repo.update(created.id, changes).await.unwrap();

        assert_eq!(updated.status, "concluido");
        assert_eq!(updated.desc, None);
        assert_eq!(updated.cliente, "Ana");
        assert_eq!(updated.qtd, 3);
    }

    #[tokio::test]
    async fn update_with_empty_changes_returns_current_row() {
        let repo = test_repo().await;
        let created = repo.create(new_pedido("Ana", 1)).await.unwrap();
        let same = repo
            .update(created.id, PedidoChanges::default())
            .await
            .unwrap();
        assert_eq!(same.cliente, created.cliente);
        assert_eq!(same.status, created.status);
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let repo = test_repo().await;
        let err = repo
            .update(999, PedidoChanges::status_only("concluido".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn delete_twice_is_not_found_the_second_time() {
        let repo = test_repo().await;
        let created = repo.create(new_pedido("Ana", 1)).await.unwrap();
        repo.delete(created.id).await.unwrap();
        assert!(matches!(
            repo.delete(created.id).await,
            Err(RepoError::NotFound)
        ));
    }
}
