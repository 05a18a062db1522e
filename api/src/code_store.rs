//! In-memory one-time codes used to gate high-value
//! transactions. Purely in-process — a restart simply invalidates every
//! outstanding code, which is accepted behavior (no durability is promised).

use std::collections::HashMap;
use std::sync::Mutex;

use jiff::{Span, Timestamp};
use rand::Rng;

use payloads::otp_required_amount_threshold;
use rust_decimal::Decimal;

const CODE_TTL_SECONDS: i64 = 300;

struct Entry {
    code: String,
    from_account: String,
    expires_at: Timestamp,
}

/// Guarded by a single mutex; TTL is checked on read, never swept by a
/// background task.
pub struct CodeStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl CodeStore {
    pub fn new() -> Self {
        CodeStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a 6-digit numeric code for `transaction_id`, overwriting any
    /// prior entry for the same id.
    pub fn issue(
        &self,
        transaction_id: &str,
        from_account: &str,
        now: Timestamp,
    ) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let expires_at = now + Span::new().seconds(CODE_TTL_SECONDS);
        self.entries.lock().unwrap().insert(
            transaction_id.to_string(),
            Entry {
                code: code.clone(),
                from_account: from_account.to_string(),
                expires_at,
            },
        );
        code
    }

    /// True iff an unexpired entry exists for `transaction_id` whose
    /// `from_account` and `code` both match. On success the entry is removed
    /// before returning, so a code can never verify twice.
    pub fn verify(
        &self,
        transaction_id: &str,
        code: &str,
        from_account: &str,
        now: Timestamp,
    ) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let matches = match entries.get(transaction_id) {
            Some(entry) => {
                entry.from_account == from_account
                    && entry.code == code
                    && entry.expires_at > now
            }
            None => false,
        };
        if matches {
            entries.remove(transaction_id);
        }
        matches
    }
}

impl Default for CodeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `amount >= OTP_REQUIRED_AMOUNT_THRESHOLD`.
pub fn required_for(amount: Decimal) -> bool {
    amount >= otp_required_amount_threshold()
}
