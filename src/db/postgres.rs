use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ClientFilter, ClientStore, StoreResult, UpdateOutcome};
use crate::models::{Client, ClientPayload, NewClient, Page, PageRequest};

const CLIENT_COLUMNS: &str = "id, name, cpf, income, birth_date, children";

/// PostgreSQL-backed client store
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        Ok(())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ClientFilter) {
    match filter {
        ClientFilter::All => {}
        ClientFilter::IncomeGreaterThan(threshold) => {
            builder.push(" WHERE income > ").push_bind(*threshold);
        }
        ClientFilter::IncomeEquals(income) => {
            builder.push(" WHERE income = ").push_bind(*income);
        }
        ClientFilter::CpfContains(fragment) => {
            builder.push(" WHERE strpos(cpf, ").push_bind(fragment.clone()).push(") > 0");
        }
    }
}

#[async_trait]
impl ClientStore for Database {
    async fn find_page(&self, filter: &ClientFilter, request: &PageRequest) -> StoreResult<Page<Client>> {
        // Count and rows come from one snapshot so totals match the content.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        // Sort column and keyword come from closed enums, never from raw input.
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM clients", CLIENT_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(format!(
                " ORDER BY {} {}, id ASC",
                request.sort.field.order_expr(),
                request.sort.direction.keyword()
            ))
            .push(" LIMIT ")
            .push_bind(i64::from(request.size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(request.offset()).unwrap_or(i64::MAX));

        let clients = select.build_query_as::<Client>().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok(Page::new(clients, request, total.max(0) as u64))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = $1",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn find_by_cpf(&self, cpf: &str) -> StoreResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE cpf = $1 ORDER BY id ASC LIMIT 1",
            CLIENT_COLUMNS
        ))
        .bind(cpf)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn insert(&self, client: NewClient) -> StoreResult<Client> {
        let created = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (name, cpf, income, birth_date, children)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(&client.name)
        .bind(&client.cpf)
        .bind(client.income)
        .bind(client.birth_date)
        .bind(client.children)
        .fetch_one(self.get_pool())
        .await?;

        Ok(created)
    }

    async fn update_with(
        &self,
        id: i64,
        payload: ClientPayload,
        now: DateTime<Utc>,
    ) -> StoreResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;

        // The row lock holds off other writers until commit; dropping `tx` rolls back.
        let current = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = $1 FOR UPDATE",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(UpdateOutcome::NotFound);
        };
        let changed = match payload.apply_to(&current, now) {
            Ok(changed) => changed,
            Err(errors) => return Ok(UpdateOutcome::Rejected(errors)),
        };

        let updated = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = $1, cpf = $2, income = $3, birth_date = $4, children = $5
            WHERE id = $6
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(&changed.name)
        .bind(&changed.cpf)
        .bind(changed.income)
        .bind(changed.birth_date)
        .bind(changed.children)
        .bind(changed.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(UpdateOutcome::Updated(updated))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(self.get_pool())
            .await?;

        Ok(total.max(0) as u64)
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use super::*;
    use crate::models::{Direction, Sort, SortField};

    async fn test_db() -> Database {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db-tests");
        let db = Database::new(&url, 2).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_client(name: &str, cpf: &str, income: f64) -> NewClient {
        NewClient {
            name: name.to_string(),
            cpf: cpf.to_string(),
            income,
            birth_date: None,
            children: 1,
        }
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let db = test_db().await;
        let created = db.insert(new_client("Db Test", "99900011122", 1234.5)).await.unwrap();
        assert_eq!(db.find_by_id(created.id).await.unwrap(), Some(created.clone()));

        let payload: ClientPayload = serde_json::from_value(serde_json::json!({ "income": 4321.0 })).unwrap();
        let outcome = db.update_with(created.id, payload, Utc::now()).await.unwrap();
        let changed = Client { income: 4321.0, ..created.clone() };
        assert_eq!(outcome, UpdateOutcome::Updated(changed.clone()));
        assert_eq!(db.find_by_id(created.id).await.unwrap(), Some(changed));

        assert!(db.delete(created.id).await.unwrap());
        assert_eq!(db.find_by_id(created.id).await.unwrap(), None);
        assert!(!db.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn cpf_fragment_filter_matches_substrings() {
        let db = test_db().await;
        let created = db.insert(new_client("Fragment", "55544433322", 1.0)).await.unwrap();
        let request = PageRequest {
            page: 0,
            size: 100,
            sort: Sort {
                field: SortField::Id,
                direction: Direction::Asc,
            },
        };

        let page = db
            .find_page(&ClientFilter::CpfContains("4443".to_string()), &request)
            .await
            .unwrap();
        assert!(page.content.iter().any(|c| c.id == created.id));
        assert!(page.content.iter().all(|c| c.cpf.contains("4443")));

        db.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_partial_updates_keep_every_field() {
        let db = std::sync::Arc::new(test_db().await);
        let created = db.insert(new_client("Race", "12312312312", 1.0)).await.unwrap();

        let renamer = {
            let db = db.clone();
            let body = serde_json::json!({ "name": "Renamed" });
            tokio::spawn(async move {
                db.update_with(created.id, serde_json::from_value(body).unwrap(), Utc::now()).await
            })
        };
        let earner = {
            let db = db.clone();
            let body = serde_json::json!({ "income": 9999.0 });
            tokio::spawn(async move {
                db.update_with(created.id, serde_json::from_value(body).unwrap(), Utc::now()).await
            })
        };
        assert!(matches!(renamer.await.unwrap().unwrap(), UpdateOutcome::Updated(_)));
        assert!(matches!(earner.await.unwrap().unwrap(), UpdateOutcome::Updated(_)));

        let stored = db.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.income, 9999.0);

        db.delete(created.id).await.unwrap();
    }

    #[tokio::test]
    async fn name_order_is_bytewise() {
        let db = test_db().await;
        let mut ids = Vec::new();
        for name in ["zz-order bruno", "zz-order Zélia", "zz-order Álvaro"] {
            ids.push(db.insert(new_client(name, "77788899900", 1.0)).await.unwrap().id);
        }
        let request = PageRequest {
            page: 0,
            size: 100,
            sort: Sort {
                field: SortField::Name,
                direction: Direction::Asc,
            },
        };

        let page = db
            .find_page(&ClientFilter::CpfContains("77788899900".to_string()), &request)
            .await
            .unwrap();
        let names: Vec<_> = page.content.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zz-order Zélia", "zz-order bruno", "zz-order Álvaro"]);
        assert_eq!(page.total_elements, page.content.len() as u64);

        for id in ids {
            db.delete(id).await.unwrap();
        }
    }
}
