//! Resource-exhaustion guards for batch operations.

#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Maximum targets per BatchGrant/BatchRevoke call.
    pub grant_batch_max: usize,
    /// Maximum user ids per share-link member add/remove call.
    pub member_batch_max: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            grant_batch_max: 100,
            member_batch_max: 50,
        }
    }
}
