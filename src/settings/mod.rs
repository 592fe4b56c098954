//! Process-wide configuration singletons.
//!
//! Upstream API credentials and notifier credentials live as two rows in
//! `settings_tb`, keyed by name, behind a read-through cache that is
//! invalidated on write. Not globals: everything goes through
//! [`SettingsService`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const API_SETTINGS: &str = "api";
const NOTIFIER_SETTINGS: &str = "notifier";

/// Upstream catalog API configuration plus last-sync metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiSettings {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub sync_interval_minutes: u32,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sync_status: Option<String>,
}

impl ApiSettings {
    fn defaults(sync_interval_minutes: u32) -> Self {
        Self {
            api_base_url: String::new(),
            api_key: String::new(),
            sync_interval_minutes,
            last_sync_at: None,
            last_sync_status: None,
        }
    }
}

/// SMTP + SMS transport credentials. Delivery itself happens behind the
/// notifier trait; this is only the stored configuration surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NotifierSettings {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default)]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub to_emails: Vec<String>,
    #[serde(default)]
    pub sms_gateway_url: String,
    #[serde(default)]
    pub sms_api_key: String,
    #[serde(default)]
    pub sms_recipients: Vec<String>,
    #[serde(default)]
    pub email_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
}

#[derive(Default)]
struct Cache {
    api: Option<ApiSettings>,
    notifier: Option<NotifierSettings>,
}

pub struct SettingsService {
    pool: PgPool,
    cache: RwLock<Cache>,
}

impl SettingsService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// Insert default rows when missing; existing rows are untouched.
    pub async fn seed_defaults(&self, default_sync_interval_minutes: u32) -> AppResult<()> {
        self.insert_if_absent(API_SETTINGS, &ApiSettings::defaults(default_sync_interval_minutes))
            .await?;
        self.insert_if_absent(NOTIFIER_SETTINGS, &NotifierSettings::default())
            .await?;
        Ok(())
    }

    async fn insert_if_absent<T: Serialize>(&self, name: &str, value: &T) -> AppResult<()> {
        let payload = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize {name} settings: {e}")))?;
        sqlx::query(
            "INSERT INTO settings_tb (name, payload) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load<T: for<'de> Deserialize<'de>>(&self, name: &str) -> AppResult<T> {
        let row = sqlx::query("SELECT payload FROM settings_tb WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("settings row {name}")))?;
        let payload: serde_json::Value = row.get("payload");
        serde_json::from_value(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt {name} settings: {e}")))
    }

    async fn save<T: Serialize>(&self, name: &str, value: &T) -> AppResult<()> {
        let payload = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize {name} settings: {e}")))?;
        sqlx::query(
            "INSERT INTO settings_tb (name, payload, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (name) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW()",
        )
        .bind(name)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn api(&self) -> AppResult<ApiSettings> {
        if let Some(cached) = self.cache.read().await.api.clone() {
            return Ok(cached);
        }
        let loaded: ApiSettings = self.load(API_SETTINGS).await?;
        self.cache.write().await.api = Some(loaded.clone());
        Ok(loaded)
    }

    pub async fn update_api(&self, mut new: ApiSettings) -> AppResult<ApiSettings> {
        // Last-sync metadata is owned by the importer, not the operator.
        let current = self.api().await?;
        new.last_sync_at = current.last_sync_at;
        new.last_sync_status = current.last_sync_status;
        if new.sync_interval_minutes == 0 {
            return Err(AppError::Validation(
                "sync_interval_minutes must be at least 1".into(),
            ));
        }
        self.save(API_SETTINGS, &new).await?;
        self.cache.write().await.api = None;
        Ok(new)
    }

    /// Importer-only: stamp the sync outcome onto the api settings row.
    pub async fn stamp_last_sync(&self, status: &str) -> AppResult<()> {
        let mut current = self.api().await?;
        current.last_sync_at = Some(Utc::now());
        current.last_sync_status = Some(status.to_string());
        self.save(API_SETTINGS, &current).await?;
        self.cache.write().await.api = None;
        Ok(())
    }

    pub async fn notifier(&self) -> AppResult<NotifierSettings> {
        if let Some(cached) = self.cache.read().await.notifier.clone() {
            return Ok(cached);
        }
        let loaded: NotifierSettings = self.load(NOTIFIER_SETTINGS).await?;
        self.cache.write().await.notifier = Some(loaded.clone());
        Ok(loaded)
    }

    pub async fn update_notifier(&self, new: NotifierSettings) -> AppResult<NotifierSettings> {
        self.save(NOTIFIER_SETTINGS, &new).await?;
        self.cache.write().await.notifier = None;
        Ok(new)
    }
}
