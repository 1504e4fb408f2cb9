pub mod exception_orders;
pub mod hotel_daily_stocks;
pub mod hotels;
pub mod pkg_order_items;
pub mod pkg_orders;
pub mod pkg_product_bundle_items;
pub mod pkg_product_daily_prices;
pub mod pkg_product_hotel_room_types;
pub mod pkg_products;
pub mod room_types;
pub mod ticket_prices;
pub mod tickets;

pub use exception_orders as exception_order_entity;
pub use exception_orders::{ExceptionStatus, ExceptionType};
pub use hotel_daily_stocks as hotel_daily_stock_entity;
pub use hotel_daily_stocks::PriceSource;
pub use hotels as hotel_entity;
pub use hotels::EnableStatus;
pub use pkg_order_items as order_item_entity;
pub use pkg_order_items::{OrderItemStatus, OrderItemType};
pub use pkg_orders as order_entity;
pub use pkg_orders::{OrderStatus, OtaPlatform};
pub use pkg_product_bundle_items as bundle_item_entity;
pub use pkg_product_daily_prices as daily_price_entity;
pub use pkg_product_hotel_room_types as hotel_room_type_entity;
pub use pkg_products as product_entity;
pub use room_types as room_type_entity;
pub use ticket_prices as ticket_price_entity;
pub use tickets as ticket_entity;
