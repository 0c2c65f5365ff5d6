//! Per-user, per-document permission grants: authorization-gated CRUD and
//! batch semantics over the grant store.


use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::Limits;
use crate::error::{AccessError, Result};
use crate::events::{Event, EventBus};
use crate::model::{Document, EffectivePermission, Permission, PermissionGrant};
use crate::store::{DocumentStore, GrantStore};

pub struct PermissionResolver {
    docs: Arc<dyn DocumentStore>,
    grants: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    limits: Limits,
}

impl PermissionResolver {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        grants: Arc<dyn GrantStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        limits: Limits,
    ) -> Self {
        Self {
            docs,
            grants,
            clock,
            events,
            limits,
        }
    }

    /// Load a document for a mutating grant operation. Absent and deleted
    /// documents are indistinguishable here: Manage-level actions on a
    /// non-active document read as not-found.
    async fn load_active(&self, document_id: Uuid) -> Result<Document> {
        let doc = self
            .docs
            .get(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        if !doc.is_active() {
            return Err(AccessError::NotFound);
        }
        Ok(doc)
    }

    /// Actor must own the document or hold Manage-or-above on it.
    async fn require_manage(&self, actor: Uuid, doc: &Document) -> Result<()> {
        let effective = self.effective_for(doc, actor).await?;
        if effective.satisfies(Permission::Manage) {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied)
        }
    }

    /// Resolve a user's effective permission against an already-loaded
    /// document. Ownership short-circuits the grant lookup entirely.
    pub async fn effective_for(
        &self,
        doc: &Document,
        user: Uuid,
    ) -> Result<EffectivePermission> {
        if doc.owner == user {
            return Ok(EffectivePermission::Owner);
        }
        match self.grants.get(doc.id, user).await? {
            Some(grant) => Ok(EffectivePermission::Granted(grant.level)),
            None => Ok(EffectivePermission::None),
        }
    }

    /// Owner => Owner; otherwise the stored grant level or None. A deleted
    /// document resolves only for its owner, so restore stays possible
    /// without revealing the document to anyone else.
    pub async fn resolve_effective(
        &self,
        document_id: Uuid,
        user: Uuid,
    ) -> Result<EffectivePermission> {
        let doc = self
            .docs
            .get(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        if !doc.is_active() && doc.owner != user {
            return Err(AccessError::NotFound);
        }
        self.effective_for(&doc, user).await
    }

    /// Pure lookup with no authorization gate; the caller (AccessGateway)
    /// is the gate. An unknown document is simply no access.
    pub async fn check(&self, document_id: Uuid, user: Uuid, level: Permission) -> Result<bool> {
        match self.resolve_effective(document_id, user).await {
            Ok(effective) => Ok(effective.satisfies(level)),
            Err(AccessError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn grant(
        &self,
        actor: Uuid,
        document_id: Uuid,
        target: Uuid,
        level: Permission,
    ) -> Result<PermissionGrant> {
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        let grant = self.apply_grant(actor, &doc, target, level).await?;
        Ok(grant)
    }

    /// Upsert a single grant row. Assumes the actor is already authorized
    /// against `doc`.
    async fn apply_grant(
        &self,
        actor: Uuid,
        doc: &Document,
        target: Uuid,
        level: Permission,
    ) -> Result<PermissionGrant> {
        if target == doc.owner {
            return Err(AccessError::Conflict(
                "owner already holds full access".into(),
            ));
        }
        let now = self.clock.now();
        let existing = self.grants.get(doc.id, target).await?;
        let grant = PermissionGrant {
            document_id: doc.id,
            user_id: target,
            level,
            granted_by: actor,
            granted_at: existing.map(|g| g.granted_at).unwrap_or(now),
            updated_at: now,
        };
        self.grants.upsert(grant.clone()).await?;
        self.events.send(Event::Granted {
            document_id: doc.id,
            user_id: target,
            level,
        });
        Ok(grant)
    }

    /// Revoking a non-existent grant is a silent no-op; revoking the owner
    /// is always refused.
    pub async fn revoke(&self, actor: Uuid, document_id: Uuid, target: Uuid) -> Result<()> {
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        if target == doc.owner {
            return Err(AccessError::Conflict("cannot revoke the owner".into()));
        }
        if self.grants.delete(document_id, target).await? {
            self.events.send(Event::Revoked {
                document_id,
                user_id: target,
            });
        }
        Ok(())
    }

    /// Like `grant`, but refuses to create a row: the target must already
    /// hold a grant on the document.
    pub async fn update(
        &self,
        actor: Uuid,
        document_id: Uuid,
        target: Uuid,
        level: Permission,
    ) -> Result<PermissionGrant> {
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        if target == doc.owner {
            return Err(AccessError::Conflict(
                "owner already holds full access".into(),
            ));
        }
        if self.grants.get(document_id, target).await?.is_none() {
            return Err(AccessError::NotFound);
        }
        self.apply_grant(actor, &doc, target, level).await
    }

    pub async fn list_for_document(
        &self,
        actor: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<PermissionGrant>> {
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        let grants = self.grants.list_by_document(document_id).await?;
        Ok(grants)
    }

    /// Apply one grant level to many targets. Duplicate ids, the actor's
    /// own id and the owner's id are silently dropped before anything is
    /// written. Oversized batches are rejected outright, never truncated.
    pub async fn batch_grant(
        &self,
        actor: Uuid,
        document_id: Uuid,
        targets: &[Uuid],
        level: Permission,
    ) -> Result<Vec<PermissionGrant>> {
        self.check_batch_size(targets.len())?;
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        let mut applied = Vec::new();
        for target in Self::dedupe_targets(targets, actor, doc.owner) {
            applied.push(self.apply_grant(actor, &doc, target, level).await?);
        }
        Ok(applied)
    }

    /// Returns how many grants were actually removed.
    pub async fn batch_revoke(
        &self,
        actor: Uuid,
        document_id: Uuid,
        targets: &[Uuid],
    ) -> Result<usize> {
        self.check_batch_size(targets.len())?;
        let doc = self.load_active(document_id).await?;
        self.require_manage(actor, &doc).await?;
        let mut removed = 0;
        for target in Self::dedupe_targets(targets, actor, doc.owner) {
            if self.grants.delete(document_id, target).await? {
                self.events.send(Event::Revoked {
                    document_id,
                    user_id: target,
                });
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn check_batch_size(&self, got: usize) -> Result<()> {
        if got == 0 {
            return Err(AccessError::Validation("empty batch".into()));
        }
        if got > self.limits.grant_batch_max {
            return Err(AccessError::BatchLimitExceeded {
                got,
                limit: self.limits.grant_batch_max,
            });
        }
        Ok(())
    }

    fn dedupe_targets(targets: &[Uuid], actor: Uuid, owner: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        targets
            .iter()
            .copied()
            .filter(|t| *t != actor && *t != owner && seen.insert(*t))
            .collect()
    }
}
