pub mod common;
pub mod inventory;
pub mod order;
pub mod pagination;
pub mod price;
pub mod sync;

pub use common::*;
pub use inventory::*;
pub use order::*;
pub use pagination::*;
pub use price::*;
pub use sync::*;
