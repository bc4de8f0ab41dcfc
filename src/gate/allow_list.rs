//! Admin allow-list parsed from a comma-separated configuration string.

use regex::Regex;
use std::{fmt, sync::LazyLock};
use tracing::warn;

/// Ordered, de-duplicated set of admin email addresses.
///
/// Entries are trimmed; case is preserved and comparison is exact, so
/// `A@x.com` does not match an entry `a@x.com`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: Vec<String>,
}

impl AdminAllowList {
    /// Parse the configured list. Empty entries are dropped; an empty or
    /// blank string yields an empty list, which admits nobody.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut emails: Vec<String> = Vec::new();
        for (index, entry) in raw.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }
            if !looks_like_email(entry) {
                warn!(index, "admin allow-list entry is not a valid email address");
            }
            if !emails.iter().any(|existing| existing == entry) {
                emails.push(entry.to_string());
            }
        }
        Self { emails }
    }

    /// Exact membership test after trimming the candidate.
    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        let candidate = email.trim();
        !candidate.is_empty() && self.emails.iter().any(|entry| entry == candidate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

// Keep addresses out of logs and debug dumps.
impl fmt::Debug for AdminAllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAllowList")
            .field("entries", &self.emails.len())
            .finish()
    }
}

static EMAIL_SHAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

fn looks_like_email(value: &str) -> bool {
    EMAIL_SHAPE.as_ref().is_some_and(|re| re.is_match(value))
}
