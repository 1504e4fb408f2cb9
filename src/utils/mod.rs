pub mod clock;
pub mod code_generator;
pub mod composite_code;

pub use clock::{Clock, SystemClock};
pub use code_generator::{generate_order_no, manual_confirmation_no};
pub use composite_code::CompositeCode;
