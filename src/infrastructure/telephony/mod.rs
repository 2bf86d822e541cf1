//! Telephony integration

pub mod adapter;
pub mod loopback;

pub use adapter::{Reservation, TelephonyAdapter};
pub use loopback::{LoopbackTelephonyProvider, ReservationBehavior};
