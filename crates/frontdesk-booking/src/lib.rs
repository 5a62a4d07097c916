//! Appointment booking and double-booking prevention

pub mod memory;
pub mod service;
pub mod store;
pub mod types;

pub use memory::MemoryAppointmentStore;
pub use service::{BookingError, BookingService};
pub use store::{AppointmentStore, AppointmentStoreError};
pub use types::{Appointment, AppointmentStatus, NewAppointment, UnknownStatus};

pub use async_trait::async_trait;
