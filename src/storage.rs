use chrono::Utc;
use sqlx::{
    FromRow, QueryBuilder, Sqlite, SqlitePool,
    query_builder::Separated,
    sqlite::{SqlitePoolOptions, SqliteRow},
};

/// StoreError
///
/// The failure taxonomy of the storage facade. Handlers map these onto their
/// resource-local envelope codes; nothing here is swallowed except by `is_exist`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("object exist")]
    ObjectExists,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::ObjectExists,
            other => StoreError::Database(other),
        }
    }
}

/// Value
///
/// A bindable column value. Entities describe their writable columns as a list of
/// these so a single facade can insert and update any table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

fn bind_value(list: &mut Separated<'_, '_, Sqlite, &'static str>, value: Value) {
    match value {
        Value::Int(v) => list.push_bind(v),
        Value::Text(v) => list.push_bind(v),
        Value::Bool(v) => list.push_bind(v),
    };
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: Value) {
    match value {
        Value::Int(v) => builder.push_bind(v),
        Value::Text(v) => builder.push_bind(v),
        Value::Bool(v) => builder.push_bind(v),
    };
}

/// Entity
///
/// Implemented by every persisted model. Besides its writable columns, each table
/// carries the base columns `id`, `created_at`, `updated_at` and `deleted_at`,
/// which the facade manages itself.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Table name, unquoted.
    const TABLE: &'static str;
    /// Writable columns, in the order `values()` yields them.
    const COLUMNS: &'static [&'static str];
    /// Idempotent DDL creating the table and its indexes.
    const SCHEMA: &'static str;

    fn values(&self) -> Vec<Value>;
}

fn table<E: Entity>() -> String {
    format!("\"{}\"", E::TABLE)
}

/// Lookup
///
/// Locates a single row: by id when the id is non-zero, otherwise by the unique `name`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Id(i64),
    Name(String),
}

impl Lookup {
    pub fn new(id: i64, name: &str) -> Self {
        if id != 0 {
            Lookup::Id(id)
        } else {
            Lookup::Name(name.to_string())
        }
    }

    fn push_predicate(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Lookup::Id(id) => {
                builder.push("id = ");
                builder.push_bind(*id);
            }
            Lookup::Name(name) => {
                builder.push("name = ");
                builder.push_bind(name.clone());
            }
        }
    }
}

impl From<i64> for Lookup {
    fn from(id: i64) -> Self {
        Lookup::Id(id)
    }
}

impl From<&str> for Lookup {
    fn from(name: &str) -> Self {
        Lookup::Name(name.to_string())
    }
}

/// Filter
///
/// A conjunction of `column = value` predicates applied by `list`. Column names
/// come from code, values are always bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(&'static str, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn push_predicates(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (column, value) in &self.conditions {
            builder.push(" AND ");
            builder.push(*column);
            builder.push(" = ");
            push_value(builder, value.clone());
        }
    }
}

/// Paginator
///
/// Normalizes a (page size, page) request against a row count. A page size of
/// zero or less means "everything on one page".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page_size: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

impl Paginator {
    pub fn new(total: i64, page_size: i64, current_page: i64) -> Self {
        if page_size <= 0 {
            return Self {
                page_size,
                current_page: 1,
                total_pages: 1,
            };
        }
        let total_pages = (total / page_size + i64::from(total % page_size != 0)).max(1);
        let current_page = current_page.clamp(1, total_pages);
        Self {
            page_size,
            current_page,
            total_pages,
        }
    }

    /// `(limit, offset)` for the SQL window, `None` when unpaginated.
    pub fn window(&self) -> Option<(i64, i64)> {
        (self.page_size > 0).then(|| (self.page_size, (self.current_page - 1).saturating_mul(self.page_size)))
    }
}

/// Store
///
/// The storage facade: uniform CRUD over any `Entity`, backed by a single
/// relational pool. Every read conjoins `deleted_at IS NULL`; the unscoped
/// variants are separate, explicitly named operations.
///
/// The pool is the only shared resource and is safe for concurrent use, so the
/// facade is cheap to clone into every request.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a private in-memory database. The pool is pinned to one connection
    /// that never expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the entity's table and indexes when missing.
    pub async fn migrate<E: Entity>(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(E::SCHEMA).execute(&self.pool).await?;
        tracing::debug!(table = E::TABLE, "table ready");
        Ok(())
    }

    /// Inserts a new row and returns it with the generated id and timestamps.
    pub async fn create<E: Entity>(&self, entity: &E) -> Result<E, StoreError> {
        let now = Utc::now();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", table::<E>()));
        builder.push(E::COLUMNS.join(", "));
        builder.push(", created_at, updated_at) VALUES (");
        {
            let mut list = builder.separated(", ");
            for value in entity.values() {
                bind_value(&mut list, value);
            }
            list.push_bind(now);
            list.push_bind(now);
        }
        builder.push(") RETURNING *");

        let created = builder
            .build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;
        tracing::debug!(table = E::TABLE, "row created");
        Ok(created)
    }

    /// Fetches one non-deleted row.
    pub async fn get<E: Entity>(&self, lookup: impl Into<Lookup>) -> Result<E, StoreError> {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {} WHERE ", table::<E>()));
        lookup.push_predicate(&mut builder);
        builder.push(" AND deleted_at IS NULL");

        builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Fetches one row whether or not it was soft-deleted.
    pub async fn get_unscoped<E: Entity>(&self, lookup: impl Into<Lookup>) -> Result<E, StoreError> {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {} WHERE ", table::<E>()));
        lookup.push_predicate(&mut builder);

        builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Writes every column of `values` onto the located row and bumps `updated_at`.
    pub async fn update<E: Entity>(&self, lookup: impl Into<Lookup>, values: &E) -> Result<E, StoreError> {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table::<E>()));
        for (column, value) in E::COLUMNS.iter().zip(values.values()) {
            builder.push(*column);
            builder.push(" = ");
            push_value(&mut builder, value);
            builder.push(", ");
        }
        builder.push("updated_at = ");
        builder.push_bind(Utc::now());
        builder.push(" WHERE ");
        lookup.push_predicate(&mut builder);
        builder.push(" AND deleted_at IS NULL RETURNING *");

        let updated = builder
            .build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        tracing::debug!(table = E::TABLE, ?lookup, "row updated");
        Ok(updated)
    }

    /// Soft delete: stamps `deleted_at`, leaving the row physically present.
    pub async fn delete<E: Entity>(&self, lookup: impl Into<Lookup>) -> Result<(), StoreError> {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET deleted_at = ", table::<E>()));
        builder.push_bind(Utc::now());
        builder.push(" WHERE ");
        lookup.push_predicate(&mut builder);
        builder.push(" AND deleted_at IS NULL");

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(table = E::TABLE, ?lookup, "row soft-deleted");
        Ok(())
    }

    /// Hard delete: physically removes the row, soft-deleted or not.
    pub async fn force_delete<E: Entity>(&self, lookup: impl Into<Lookup>) -> Result<(), StoreError> {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE ", table::<E>()));
        lookup.push_predicate(&mut builder);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(table = E::TABLE, ?lookup, "row removed");
        Ok(())
    }

    /// Hard-deletes the given ids in order inside one transaction. Either every
    /// row goes or none does.
    pub async fn force_delete_all<E: Entity>(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table::<E>());
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for id in ids {
            removed += sqlx::query(&sql).bind(*id).execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        tracing::debug!(table = E::TABLE, removed, "rows removed in transaction");
        Ok(removed)
    }

    /// Returns the number of matching non-deleted rows and the requested page.
    ///
    /// `limit <= 0` returns every row; `page` is 1-based and clamps to the last page.
    pub async fn list<E: Entity>(&self, limit: i64, page: i64, filter: &Filter) -> Result<(i64, Vec<E>), StoreError> {
        let mut count = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL",
            table::<E>()
        ));
        filter.push_predicates(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let paginator = Paginator::new(total, limit, page);
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT * FROM {} WHERE deleted_at IS NULL",
            table::<E>()
        ));
        filter.push_predicates(&mut builder);
        builder.push(" ORDER BY id");
        if let Some((limit, offset)) = paginator.window() {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let rows = builder.build_query_as::<E>().fetch_all(&self.pool).await?;
        Ok((total, rows))
    }

    /// Existence probe for idempotent bootstrap steps. Absence is `false`, and so
    /// is a failing query, which is logged instead of raised.
    pub async fn is_exist<E: Entity>(&self, lookup: impl Into<Lookup>) -> bool {
        let lookup = lookup.into();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE ",
            table::<E>()
        ));
        lookup.push_predicate(&mut builder);
        builder.push(" AND deleted_at IS NULL)");

        match builder.build_query_scalar::<i64>().fetch_one(&self.pool).await {
            Ok(found) => found != 0,
            Err(e) => {
                tracing::warn!(table = E::TABLE, ?lookup, "existence probe failed: {:?}", e);
                false
            }
        }
    }
}
