//! A single subscription: one handle plus its channel token.

use crate::domain::token::tokens_match;
use crate::domain::{SubscriptionId, Token};
use crate::typed::WeakHandle;

/// Subscription entry stored in exactly one partition list.
///
/// Entries are shared as `Arc<SubscriptionEntry>` so that a publish can
/// snapshot a list without holding the partition lock.
#[derive(Debug)]
pub struct SubscriptionEntry {
    pub id: SubscriptionId,
    pub handle: WeakHandle,
    pub token: Option<Token>,
}

impl SubscriptionEntry {
    pub fn new(handle: WeakHandle, token: Option<Token>) -> Self {
        Self {
            id: SubscriptionId::generate(),
            handle,
            token,
        }
    }

    /// Both unset, or both set and equal.
    pub fn matches_token(&self, published: Option<&Token>) -> bool {
        tokens_match(self.token.as_ref(), published)
    }
}
