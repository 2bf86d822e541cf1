//! Call bounded context - lifecycle rules of the assistant voice call

pub mod capability;
pub mod error;
pub mod event;
pub mod session;
pub mod value_object;

pub use capability::{CapabilityProfile, DeviceInfo, InterfaceIdiom, TelephonyMode};
pub use error::CallError;
pub use event::CallEvent;
pub use session::CallSession;
pub use value_object::{CallPurpose, CallState, ReservationStatus};
