pub mod appointment;
pub mod booking;
pub mod request;

pub use appointment::{AppointmentWindow, CallContext, Contact, DateResolution, DateSource, TimeOfDay};
pub use booking::{AppointmentSummary, BookingOutcome, BookingResponse, NeededField, ParseFailure};
pub use request::BookingRequest;
