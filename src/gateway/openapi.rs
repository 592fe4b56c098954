//! OpenAPI document served at /docs.

use utoipa::OpenApi;

use crate::auth::handlers as auth_handlers;
use crate::gateway::handlers::{admin, health, orders, picklist, stock, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Auth
        auth_handlers::login,
        auth_handlers::logout,
        auth_handlers::refresh,
        auth_handlers::me,
        auth_handlers::change_password,
        // Picking
        picklist::get_picklist,
        picklist::get_sku_orders,
        picklist::post_pick,
        picklist::post_not_in_stock,
        picklist::get_picked_items,
        picklist::post_revert,
        // Orders
        orders::get_status,
        orders::get_ready_to_pack,
        orders::get_packed,
        orders::get_order,
        orders::post_mark_packed,
        orders::post_revert_to_picking,
        orders::post_change_state,
        orders::patch_update_message,
        orders::post_split,
        orders::post_unsplit,
        // Out of stock
        stock::get_out_of_stock,
        stock::get_export,
        stock::post_send,
        stock::post_resolve,
        stock::post_toggle_ordered,
        stock::post_toggle_na_cancel,
        // Admin
        admin::post_sync,
        admin::get_sync_status,
        admin::get_settings,
        admin::put_settings,
        admin::get_notifier_settings,
        admin::put_notifier_settings,
        // Users
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::reset_password,
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Login, tokens, password"),
        (name = "Picking", description = "Pick list and pick-floor actions"),
        (name = "Orders", description = "Order boards and transitions"),
        (name = "OutOfStock", description = "Shortage backlog"),
        (name = "Admin", description = "Sync and settings (superadmin)"),
        (name = "Users", description = "User administration (admin)"),
    ),
    info(
        title = "packflow API",
        description = "Warehouse order-picking coordinator"
    )
)]
pub struct ApiDoc;
