//! Single entry point for "can user U do action A on document D".
//! Short-circuits on ownership, otherwise defers to the grant lookup.
//! Read-only: checking access never mutates anything.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::model::{EffectivePermission, Permission};
use crate::permission::PermissionResolver;
use crate::store::DocumentStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub effective: EffectivePermission,
}

pub struct AccessGateway {
    docs: Arc<dyn DocumentStore>,
    resolver: Arc<PermissionResolver>,
}

impl AccessGateway {
    pub fn new(docs: Arc<dyn DocumentStore>, resolver: Arc<PermissionResolver>) -> Self {
        Self { docs, resolver }
    }

    /// Decide whether `user` holds `required` on the document. An absent
    /// document is not-found; a deleted one is not-found to everyone but
    /// its owner, who still resolves (restore must stay possible without
    /// revealing deletion to anyone else).
    pub async fn check_access(
        &self,
        user: Uuid,
        document_id: Uuid,
        required: Permission,
    ) -> Result<AccessDecision> {
        let doc = self
            .docs
            .get(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        if !doc.is_active() && doc.owner != user {
            return Err(AccessError::NotFound);
        }
        if doc.owner == user {
            return Ok(AccessDecision {
                allowed: true,
                effective: EffectivePermission::Owner,
            });
        }
        let effective = self.resolver.effective_for(&doc, user).await?;
        Ok(AccessDecision {
            allowed: effective.satisfies(required),
            effective,
        })
    }

    /// `check_access`, but an insufficient level becomes an error. Meant
    /// for write paths where existence is already established; read paths
    /// should map the denial through `AccessError::disguise_denial`.
    pub async fn require(
        &self,
        user: Uuid,
        document_id: Uuid,
        required: Permission,
    ) -> Result<EffectivePermission> {
        let decision = self.check_access(user, document_id, required).await?;
        if decision.allowed {
            Ok(decision.effective)
        } else {
            Err(AccessError::PermissionDenied)
        }
    }
}
