//! Database entities

pub mod appointment;
pub mod patient;
pub mod user;

pub use appointment::Entity as Appointment;
pub use patient::Entity as Patient;
pub use user::Entity as User;

pub mod prelude {
    pub use super::appointment::Entity as Appointment;
    pub use super::patient::Entity as Patient;
    pub use super::user::Entity as User;
}
