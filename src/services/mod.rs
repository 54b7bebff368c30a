pub mod booking;
pub mod calendar;
pub mod context;
pub mod dates;
pub mod times;
pub mod window;
