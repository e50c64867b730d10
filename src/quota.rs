// Daily AI usage quota
// In-memory, per-process counters: a soft abuse guard, not a billing meter.
// A process restart starts the day over; multi-instance deployments need an
// externally shared counter instead.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub const USER_DAILY_LIMIT: u32 = 50;
pub const GLOBAL_DAILY_LIMIT: u32 = 1000;

struct Counters {
    per_user: HashMap<String, u32>,
    global_total: u32,
    last_reset: NaiveDate,
}

/// Tracks per-user and global call counts for the current calendar day.
/// Construct one and share it; the ledger is an injected dependency, not a
/// module singleton.
pub struct QuotaLedger {
    state: Mutex<Counters>,
    user_limit: u32,
    global_limit: u32,
}

impl Default for QuotaLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaLedger {
    pub fn new() -> Self {
        Self::with_limits(USER_DAILY_LIMIT, GLOBAL_DAILY_LIMIT)
    }

    pub fn with_limits(user_limit: u32, global_limit: u32) -> Self {
        Self {
            state: Mutex::new(Counters {
                per_user: HashMap::new(),
                global_total: 0,
                last_reset: Utc::now().date_naive(),
            }),
            user_limit,
            global_limit,
        }
    }

    /// Admit or deny one call for `user_id`, counting it when admitted.
    pub fn try_consume(&self, user_id: &str) -> bool {
        self.try_consume_on(user_id, Utc::now().date_naive())
    }

    /// Same as `try_consume` with the calendar date injected. The rollover
    /// check, both limit checks, and the increments form one critical
    /// section; a read-then-write split would let concurrent callers slip
    /// past either limit at the boundary.
    pub fn try_consume_on(&self, user_id: &str, today: NaiveDate) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.last_reset != today {
            state.per_user.clear();
            state.global_total = 0;
            state.last_reset = today;
        }
        if state.global_total >= self.global_limit {
            return false;
        }
        let used = state.per_user.get(user_id).copied().unwrap_or(0);
        if used >= self.user_limit {
            return false;
        }
        state.per_user.insert(user_id.to_string(), used + 1);
        state.global_total += 1;
        true
    }

    /// Calls counted against `user_id` so far today. Observability only.
    pub fn used_today(&self, user_id: &str) -> u32 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.per_user.get(user_id).copied().unwrap_or(0)
    }
}
