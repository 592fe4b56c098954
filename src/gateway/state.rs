//! Shared gateway state.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::importer::SyncEngine;
use crate::orders::OrderService;
use crate::picking::PickingService;
use crate::settings::SettingsService;
use crate::shortage::ShortageService;

/// Everything a handler can reach. Services own clones of the pool;
/// the engines shared with the scheduler are behind `Arc`.
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    pub picking: PickingService,
    pub orders: OrderService,
    pub shortage: ShortageService,
    pub settings: Arc<SettingsService>,
    pub sync: Arc<SyncEngine>,
}
