//! Allow-list check run on every sign-in before any data is touched.

use shared::Identity;
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::errors::{FinanceError, FinanceResult};

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    allowed: BTreeSet<String>,
}

impl AccessGate {
    pub fn new<I, S>(allowed_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed_emails
            .into_iter()
            .map(|email| normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        Self { allowed }
    }

    /// Case-insensitive allow-list membership
    pub fn is_authorized(&self, email: &str) -> bool {
        self.allowed.contains(&normalize_email(email))
    }

    /// Accept or reject a freshly signed-in identity
    pub fn authorize(&self, identity: &Identity) -> FinanceResult<()> {
        match identity.email.as_deref() {
            Some(email) if self.is_authorized(email) => {
                info!("Access granted to {}", email);
                Ok(())
            }
            email => {
                warn!("Access denied for {:?}", email);
                Err(FinanceError::AccessDenied {
                    email: email.map(str::to_string),
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
