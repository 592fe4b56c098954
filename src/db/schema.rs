//! Schema bootstrap.
//!
//! All DDL is idempotent (`IF NOT EXISTS`) and runs once at startup.
//! The relational model:
//!
//! ```text
//! products_tb ◄──┐
//!                │ RESTRICT
//! orders_tb ◄── order_lines_tb ◄── pick_events_tb (RESTRICT: audit
//!    CASCADE                        survives line cleanup attempts)
//!
//! stock_exceptions_tb   standalone snapshots (order_numbers is JSONB,
//!                       not a foreign key)
//! sync_logs_tb          one row per import run
//! settings_tb           singleton rows keyed by name
//! users_tb              operator accounts
//! ```

use anyhow::{Context, Result};
use sqlx::PgPool;

/// Create all tables and indexes.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing database schema...");

    for (name, ddl) in TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {name}"))?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create index: {ddl}"))?;
    }

    tracing::info!("Database schema initialized");
    Ok(())
}

const TABLES: &[(&str, &str)] = &[
    ("products_tb", CREATE_PRODUCTS_TABLE),
    ("orders_tb", CREATE_ORDERS_TABLE),
    ("order_lines_tb", CREATE_ORDER_LINES_TABLE),
    ("pick_events_tb", CREATE_PICK_EVENTS_TABLE),
    ("stock_exceptions_tb", CREATE_STOCK_EXCEPTIONS_TABLE),
    ("sync_logs_tb", CREATE_SYNC_LOGS_TABLE),
    ("settings_tb", CREATE_SETTINGS_TABLE),
    ("users_tb", CREATE_USERS_TABLE),
];

const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products_tb (
    id                BIGSERIAL PRIMARY KEY,
    sku               TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    category          TEXT NOT NULL DEFAULT '',
    subcategory       TEXT,
    image_url         TEXT,
    price             NUMERIC(12, 2),
    vendor_name       TEXT,
    variation_details JSONB,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at        TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders_tb (
    id               BIGSERIAL PRIMARY KEY,
    external_id      TEXT NOT NULL UNIQUE,
    number           TEXT NOT NULL,
    customer_name    TEXT NOT NULL DEFAULT '',
    status           TEXT NOT NULL DEFAULT 'open',
    ready_to_pack    BOOLEAN NOT NULL DEFAULT FALSE,
    total_shipments  INT NOT NULL DEFAULT 1,
    current_shipment INT NOT NULL DEFAULT 1,
    customer_message TEXT,
    email_sent       BOOLEAN NOT NULL DEFAULT FALSE,
    packed_at        TIMESTAMPTZ,
    packed_by        TEXT,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT orders_shipment_bounds CHECK (
        total_shipments >= 1 AND current_shipment BETWEEN 1 AND total_shipments
    )
)
"#;

const CREATE_ORDER_LINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_lines_tb (
    id             BIGSERIAL PRIMARY KEY,
    order_id       BIGINT NOT NULL REFERENCES orders_tb(id) ON DELETE CASCADE,
    product_id     BIGINT NOT NULL REFERENCES products_tb(id) ON DELETE RESTRICT,
    qty_ordered    INT NOT NULL CHECK (qty_ordered > 0),
    qty_picked     INT NOT NULL DEFAULT 0 CHECK (qty_picked >= 0),
    qty_short      INT NOT NULL DEFAULT 0 CHECK (qty_short >= 0),
    shipment_batch INT NOT NULL DEFAULT 1 CHECK (shipment_batch >= 1),
    CONSTRAINT order_lines_progress CHECK (qty_picked + qty_short <= qty_ordered),
    CONSTRAINT order_lines_order_product_uq UNIQUE (order_id, product_id)
)
"#;

const CREATE_PICK_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pick_events_tb (
    id            BIGSERIAL PRIMARY KEY,
    order_line_id BIGINT NOT NULL REFERENCES order_lines_tb(id) ON DELETE RESTRICT,
    delta_qty     INT NOT NULL,
    kind          TEXT NOT NULL,
    username      TEXT NOT NULL,
    notes         TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_STOCK_EXCEPTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_exceptions_tb (
    id                   BIGSERIAL PRIMARY KEY,
    sku                  TEXT NOT NULL,
    product_title        TEXT NOT NULL,
    category             TEXT NOT NULL DEFAULT '',
    vendor_name          TEXT,
    qty_short            INT NOT NULL CHECK (qty_short > 0),
    order_numbers        JSONB NOT NULL DEFAULT '[]',
    reported_by          TEXT NOT NULL,
    created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resolved             BOOLEAN NOT NULL DEFAULT FALSE,
    ordered_from_company BOOLEAN NOT NULL DEFAULT FALSE,
    na_cancel            BOOLEAN NOT NULL DEFAULT FALSE
)
"#;

const CREATE_SYNC_LOGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_logs_tb (
    id               BIGSERIAL PRIMARY KEY,
    started_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at     TIMESTAMPTZ,
    status           TEXT NOT NULL DEFAULT 'in_progress',
    orders_fetched   INT NOT NULL DEFAULT 0,
    orders_created   INT NOT NULL DEFAULT 0,
    orders_updated   INT NOT NULL DEFAULT 0,
    products_created INT NOT NULL DEFAULT 0,
    products_updated INT NOT NULL DEFAULT 0,
    items_created    INT NOT NULL DEFAULT 0,
    items_updated    INT NOT NULL DEFAULT 0,
    warnings         INT NOT NULL DEFAULT 0,
    error_message    TEXT
)
"#;

const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings_tb (
    name       TEXT PRIMARY KEY,
    payload    JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users_tb (
    id            BIGSERIAL PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'staff',
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders_tb (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_ready ON orders_tb (ready_to_pack)",
    "CREATE INDEX IF NOT EXISTS idx_orders_created ON orders_tb (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_order_lines_product ON order_lines_tb (product_id)",
    "CREATE INDEX IF NOT EXISTS idx_pick_events_line ON pick_events_tb (order_line_id)",
    "CREATE INDEX IF NOT EXISTS idx_pick_events_created ON pick_events_tb (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_sync_logs_started ON sync_logs_tb (started_at)",
    "CREATE INDEX IF NOT EXISTS idx_sync_logs_status ON sync_logs_tb (status)",
    "CREATE INDEX IF NOT EXISTS idx_stock_exceptions_created ON stock_exceptions_tb (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_stock_exceptions_resolved ON stock_exceptions_tb (resolved)",
];
