use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params, params_from_iter};
use serde_json::{Map, Value};

use crate::widget::{AggregateFunction, BindValue, CompiledQuery, FieldKind, OutputKind};

/// Async-safe handle to the application database.
///
/// Wraps `CopilotDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, keeping synchronous SQLite
/// I/O off the async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<CopilotDb>>,
}

impl DbHandle {
    pub fn new(db: CopilotDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&CopilotDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

/// Input for `CopilotDb::create_sale`.
#[derive(Debug, Clone, Default)]
pub struct NewSale {
    pub name: String,
    pub canal_id: Option<i64>,
    pub price: f64,
    pub benefit: f64,
    pub nb_product: Option<f64>,
    pub ursaf: f64,
    pub expense: f64,
    pub commission: f64,
    pub time: f64,
    /// `YYYY-MM-DD HH:MM:SS`; `None` stamps the current time.
    pub created_at: Option<String>,
}

/// One product line of a sale.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewSaleLine {
    pub product_id: i64,
    pub price_id: Option<i64>,
    pub client_id: Option<i64>,
}

/// Input for `CopilotDb::create_price`.
#[derive(Debug, Clone, Default)]
pub struct NewPrice {
    pub name: String,
    pub price: f64,
    pub benefit: f64,
    pub ursaf: f64,
    pub expense: f64,
    pub commission: f64,
    pub time: f64,
}

pub struct CopilotDb {
    pub(crate) conn: Connection,
}

impl CopilotDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS app_user (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL DEFAULT '',
                    first_name TEXT,
                    last_name TEXT,
                    roles TEXT NOT NULL DEFAULT '[\"ROLE_USER\"]',
                    objective_value INTEGER,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS product (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    image_name TEXT,
                    is_archived INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'active',
                    price REAL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS client (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS sales_channel (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS price (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    product_id INTEGER NOT NULL REFERENCES product(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    price REAL NOT NULL DEFAULT 0,
                    benefit REAL NOT NULL DEFAULT 0,
                    ursaf REAL NOT NULL DEFAULT 0,
                    expense REAL NOT NULL DEFAULT 0,
                    commission REAL NOT NULL DEFAULT 0,
                    time REAL NOT NULL DEFAULT 0,
                    is_archived INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS sale (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
                    canal_id INTEGER REFERENCES sales_channel(id) ON DELETE SET NULL,
                    name TEXT NOT NULL DEFAULT '',
                    price REAL NOT NULL DEFAULT 0,
                    benefit REAL NOT NULL DEFAULT 0,
                    nb_product REAL,
                    ursaf REAL NOT NULL DEFAULT 0,
                    expense REAL NOT NULL DEFAULT 0,
                    commission REAL NOT NULL DEFAULT 0,
                    time REAL NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS sales_product (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sale_id INTEGER NOT NULL REFERENCES sale(id) ON DELETE CASCADE,
                    product_id INTEGER NOT NULL REFERENCES product(id) ON DELETE CASCADE,
                    price_id INTEGER REFERENCES price(id) ON DELETE SET NULL,
                    client_id INTEGER REFERENCES client(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_product_user ON product(user_id);
                CREATE INDEX IF NOT EXISTS idx_client_user ON client(user_id);
                CREATE INDEX IF NOT EXISTS idx_sales_channel_user ON sales_channel(user_id);
                CREATE INDEX IF NOT EXISTS idx_price_product ON price(product_id);
                CREATE INDEX IF NOT EXISTS idx_sale_user_created ON sale(user_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_sales_product_sale ON sales_product(sale_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Inserts (seed data and tests) ─────────────────────────────────

    pub fn create_user(&self, email: &str, first_name: &str, last_name: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO app_user (email, first_name, last_name) VALUES (?1, ?2, ?3)",
                params![email, first_name, last_name],
            )
            .context("Failed to insert user")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Set or clear the user's monthly revenue objective.
    pub fn set_objective(&self, user_id: i64, objective: Option<i64>) -> Result<()> {
        self.conn
            .execute(
                "UPDATE app_user SET objective_value = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![user_id, objective],
            )
            .context("Failed to update revenue objective")?;
        Ok(())
    }

    pub fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM app_user WHERE email = ?1")
            .context("Failed to prepare find_user_id_by_email")?;
        let mut rows = stmt
            .query_map(params![email], |row| row.get(0))
            .context("Failed to query user")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read user row")?)),
            None => Ok(None),
        }
    }

    pub fn create_product(
        &self,
        user_id: i64,
        name: &str,
        status: &str,
        price: Option<f64>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO product (user_id, name, status, price) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, name, status, price],
            )
            .context("Failed to insert product")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_client(&self, user_id: i64, name: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO client (user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )
            .context("Failed to insert client")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_sales_channel(&self, user_id: i64, name: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO sales_channel (user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )
            .context("Failed to insert sales channel")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn create_price(&self, product_id: i64, price: &NewPrice) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO price (product_id, name, price, benefit, ursaf, expense, commission, time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    product_id,
                    price.name,
                    price.price,
                    price.benefit,
                    price.ursaf,
                    price.expense,
                    price.commission,
                    price.time
                ],
            )
            .context("Failed to insert price")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a sale and its product lines atomically.
    pub fn create_sale(&self, user_id: i64, sale: &NewSale, lines: &[NewSaleLine]) -> Result<i64> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin sale transaction")?;
        tx.execute(
            "INSERT INTO sale (user_id, canal_id, name, price, benefit, nb_product, ursaf, expense, commission, time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     COALESCE(?11, datetime('now')), COALESCE(?11, datetime('now')))",
            params![
                user_id,
                sale.canal_id,
                sale.name,
                sale.price,
                sale.benefit,
                sale.nb_product,
                sale.ursaf,
                sale.expense,
                sale.commission,
                sale.time,
                sale.created_at
            ],
        )
        .context("Failed to insert sale")?;
        let sale_id = tx.last_insert_rowid();
        for line in lines {
            tx.execute(
                "INSERT INTO sales_product (sale_id, product_id, price_id, client_id) VALUES (?1, ?2, ?3, ?4)",
                params![sale_id, line.product_id, line.price_id, line.client_id],
            )
            .context("Failed to insert sales_product")?;
        }
        tx.commit().context("Failed to commit sale")?;
        Ok(sale_id)
    }

    // ── Widget queries ────────────────────────────────────────────────

    /// Execute a compiled widget query, keying each row by logical field name.
    pub fn run_select(&self, query: &CompiledQuery) -> Result<Vec<Map<String, Value>>> {
        let mut stmt = self
            .conn
            .prepare(&query.sql)
            .context("Failed to prepare widget query")?;
        let params = query.params.iter().map(to_sql_value);
        let mut rows = stmt
            .query(params_from_iter(params))
            .context("Failed to run widget query")?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().context("Failed to read widget row")? {
            let mut map = Map::with_capacity(query.columns.len());
            for (idx, column) in query.columns.iter().enumerate() {
                let value = row.get_ref(idx).context("Failed to read widget column")?;
                map.insert(column.key.clone(), json_value(value, column.kind));
            }
            out.push(map);
        }
        Ok(out)
    }
}

fn to_sql_value(value: &BindValue) -> SqlValue {
    match value {
        BindValue::Null => SqlValue::Null,
        BindValue::Integer(i) => SqlValue::Integer(*i),
        BindValue::Real(f) => SqlValue::Real(*f),
        BindValue::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn json_value(value: ValueRef<'_>, kind: OutputKind) -> Value {
    let field_kind = match kind {
        OutputKind::Field(kind) => Some(kind),
        OutputKind::Aggregate(AggregateFunction::Min | AggregateFunction::Max, kind) => kind,
        OutputKind::Aggregate(..) => None,
    };
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if field_kind == Some(FieldKind::Bool) => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if field_kind == Some(FieldKind::Json) {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            } else {
                Value::String(text)
            }
        }
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
