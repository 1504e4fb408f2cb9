pub mod exception_order;
pub mod inventory;
pub mod order;
pub mod package;
pub mod webhook;

pub use exception_order::exception_order_config;
pub use inventory::inventory_config;
pub use order::order_config;
pub use package::package_config;
pub use webhook::webhook_config;
