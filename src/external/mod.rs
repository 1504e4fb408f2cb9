pub mod ota;
pub mod provider;

pub use ota::{
    CalendarPrice, CalendarStock, CtripClient, FliggyClient, MeituanClient, OtaPusher,
    PlatformRegistry,
};
pub use provider::{BookingRequest, HttpResourceProvider, ResourceProvider};
