use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::services::calendar::CalendarProvider;

pub struct AppState {
    pub config: AppConfig,
    pub calendar: Box<dyn CalendarProvider>,
    pub booking_locks: BookingLocks,
}

impl AppState {
    pub fn new(config: AppConfig, calendar: Box<dyn CalendarProvider>) -> Self {
        Self {
            config,
            calendar,
            booking_locks: BookingLocks::default(),
        }
    }
}

/// One async mutex per calendar id. Holding it across check-then-create keeps two
/// requests in this process from booking the same free slot.
#[derive(Default)]
pub struct BookingLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BookingLocks {
    pub fn for_calendar(&self, calendar_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(calendar_id.to_string()).or_default())
    }
}
