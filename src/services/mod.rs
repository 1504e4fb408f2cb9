pub mod change_router;
pub mod daily_price_service;
pub mod exception_order_service;
pub mod fulfillment_service;
pub mod inventory_debouncer;
pub mod inventory_push_service;
pub mod order_router;
pub mod ota_sync_service;
pub mod package_service;
pub mod price_calculator;
pub mod stock_service;

pub use change_router::*;
pub use daily_price_service::*;
pub use exception_order_service::*;
pub use fulfillment_service::*;
pub use inventory_debouncer::*;
pub use inventory_push_service::*;
pub use order_router::*;
pub use ota_sync_service::*;
pub use package_service::*;
pub use price_calculator::*;
pub use stock_service::*;
