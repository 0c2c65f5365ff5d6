//! Public and private share links: issuance, mutation and the anonymous
//! redemption path. This is the only component reachable by
//! unauthenticated callers, so every lookup failure on the redemption
//! path is shaped to avoid leaking what exists.


use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::Limits;
use crate::error::{AccessError, Result};
use crate::events::{Event, EventBus};
use crate::model::{
    Document, Permission, ShareLink, ShareLinkKind, ShareLinkMember,
};
use crate::permission::PermissionResolver;
use crate::store::{DocumentStore, ShareLinkStore};
use crate::token::TokenGenerator;

/// Partial update for a share link; only supplied fields change.
#[derive(Clone, Debug, Default)]
pub struct LinkUpdate {
    pub permission: Option<Permission>,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LinkUpdate {
    fn is_noop(&self) -> bool {
        self.permission.is_none() && self.password.is_none() && self.expires_at.is_none()
    }
}

pub struct ShareLinkManager {
    docs: Arc<dyn DocumentStore>,
    links: Arc<dyn ShareLinkStore>,
    resolver: Arc<PermissionResolver>,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
    events: EventBus,
    limits: Limits,
}

impl ShareLinkManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        links: Arc<dyn ShareLinkStore>,
        resolver: Arc<PermissionResolver>,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenGenerator>,
        events: EventBus,
        limits: Limits,
    ) -> Self {
        Self {
            docs,
            links,
            resolver,
            clock,
            tokens,
            events,
            limits,
        }
    }

    async fn load_active_document(&self, document_id: Uuid) -> Result<Document> {
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

    /// Issue a new link. The actor must own the document or hold
    /// Manage-or-above. The link is Private iff at least one target user
    /// survives deduplication, else Public.
    pub async fn create_link(
        &self,
        actor: Uuid,
        document_id: Uuid,
        permission: Permission,
        password: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        share_with: &[Uuid],
    ) -> Result<ShareLink> {
        let doc = self.load_active_document(document_id).await?;
        let effective = self.resolver.effective_for(&doc, actor).await?;
        if !effective.satisfies(Permission::Manage) {
            return Err(AccessError::PermissionDenied);
        }
        if permission > Permission::link_ceiling() {
            return Err(AccessError::Validation(
                "share link permission is capped at manage".into(),
            ));
        }
        let now = self.clock.now();
        if let Some(expires) = expires_at {
            if expires <= now {
                return Err(AccessError::Validation(
                    "expiry must be in the future".into(),
                ));
            }
        }
        let members = dedupe_users(share_with, actor);
        if members.len() > self.limits.member_batch_max {
            return Err(AccessError::BatchLimitExceeded {
                got: members.len(),
                limit: self.limits.member_batch_max,
            });
        }
        let kind = if members.is_empty() {
            ShareLinkKind::Public
        } else {
            ShareLinkKind::Private
        };
        let password_hash = match password {
            Some(pw) => Some(hash_password(pw)?),
            None => None,
        };
        let link = ShareLink {
            id: Uuid::new_v4(),
            token: self.tokens.generate()?,
            document_id,
            kind,
            permission,
            password_hash,
            expires_at,
            created_by: actor,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.links.insert(link.clone()).await?;
        for user_id in members {
            self.links
                .add_member(ShareLinkMember {
                    share_id: link.id,
                    user_id,
                    added_at: now,
                })
                .await?;
        }
        self.events.send(Event::LinkCreated {
            document_id,
            share_id: link.id,
        });
        Ok(link)
    }

    /// Load a link and verify the actor may manage it: link creator or
    /// document owner. Link management on a deleted document reads as
    /// not-found.
    async fn load_managed(&self, actor: Uuid, link_id: Uuid) -> Result<(ShareLink, Document)> {
        let link = self.links.get(link_id).await?.ok_or(AccessError::NotFound)?;
        let doc = self.load_active_document(link.document_id).await?;
        if actor != link.created_by && actor != doc.owner {
            return Err(AccessError::PermissionDenied);
        }
        Ok((link, doc))
    }

    /// Partial update. A call that supplies nothing is valid and returns
    /// the entity unchanged.
    pub async fn update_link(
        &self,
        actor: Uuid,
        link_id: Uuid,
        update: LinkUpdate,
    ) -> Result<ShareLink> {
        let (mut link, _doc) = self.load_managed(actor, link_id).await?;
        if update.is_noop() {
            return Ok(link);
        }
        let now = self.clock.now();
        if let Some(permission) = update.permission {
            if permission > Permission::link_ceiling() {
                return Err(AccessError::Validation(
                    "share link permission is capped at manage".into(),
                ));
            }
            link.permission = permission;
        }
        if let Some(expires) = update.expires_at {
            if expires <= now {
                return Err(AccessError::Validation(
                    "expiry must be in the future".into(),
                ));
            }
            link.expires_at = Some(expires);
        }
        if let Some(pw) = update.password {
            link.password_hash = Some(hash_password(&pw)?);
        }
        link.updated_at = now;
        self.links.update(link.clone()).await?;
        Ok(link)
    }

    /// Deletion is immediate and permanent; links have no soft delete.
    pub async fn delete_link(&self, actor: Uuid, link_id: Uuid) -> Result<()> {
        let (link, _doc) = self.load_managed(actor, link_id).await?;
        self.links.delete(link.id).await?;
        self.events.send(Event::LinkDeleted {
            document_id: link.document_id,
            share_id: link.id,
        });
        Ok(())
    }

    /// The anonymous redemption path. Returns the link on success; the
    /// caller layers read/redeem operations on top of the link's capped
    /// permission. Never grants write access by itself.
    pub async fn validate_access(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<ShareLink> {
        let link = self
            .links
            .get_by_token(token)
            .await?
            .ok_or(AccessError::NotFound)?;
        if link.is_expired(self.clock.now()) {
            return Err(AccessError::Expired);
        }
        if let Some(hash) = &link.password_hash {
            let supplied = password.unwrap_or("");
            // an empty password can never match a protected link; reject
            // before touching the verifier
            if supplied.is_empty() {
                return Err(AccessError::InvalidPassword);
            }
            verify_password(supplied, hash)?;
        }
        // a link to a deleted document behaves as if the link never
        // existed; deletion is not revealed to link holders
        match self.docs.get(link.document_id).await? {
            Some(doc) if doc.is_active() => {}
            _ => return Err(AccessError::NotFound),
        }
        self.events.send(Event::LinkRedeemed { share_id: link.id });
        Ok(link)
    }

    /// Enforce the member whitelist for private links. Public links admit
    /// anyone. A non-member (or anonymous caller) of a private link sees
    /// not-found, never a denial that confirms the link exists.
    pub async fn authorize_redeemer(&self, link: &ShareLink, user: Option<Uuid>) -> Result<()> {
        if link.kind == ShareLinkKind::Public {
            return Ok(());
        }
        let Some(user) = user else {
            return Err(AccessError::NotFound);
        };
        let members = self.links.list_members(link.id).await?;
        if members.iter().any(|m| m.user_id == user) {
            Ok(())
        } else {
            Err(AccessError::NotFound)
        }
    }

    /// Best-effort view accounting. A failure here is logged and
    /// discarded; it must never block content delivery.
    pub async fn record_access(&self, link: &ShareLink, source_ip: &str) {
        let now = self.clock.now();
        if let Err(e) = self.links.record_view(link.id, source_ip, now).await {
            tracing::warn!(
                share_id = %link.id,
                source_ip,
                "failed to record share link access: {}",
                e
            );
        }
    }

    /// Add users to a private link's whitelist. Adding an existing member
    /// is silently ignored; returns how many were newly added.
    pub async fn add_members(
        &self,
        actor: Uuid,
        link_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<usize> {
        let (link, _doc) = self.load_managed(actor, link_id).await?;
        self.require_private(&link)?;
        self.check_member_batch(user_ids.len())?;
        let now = self.clock.now();
        let existing: HashSet<Uuid> = self
            .links
            .list_members(link.id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        let mut added = 0;
        for user_id in dedupe_users(user_ids, actor) {
            if existing.contains(&user_id) {
                continue;
            }
            self.links
                .add_member(ShareLinkMember {
                    share_id: link.id,
                    user_id,
                    added_at: now,
                })
                .await?;
            added += 1;
        }
        Ok(added)
    }

    /// Removing a non-member is a silent no-op; returns how many were
    /// actually removed. Unlike adds, the actor's own id is a valid
    /// target: a creator whom the owner whitelisted may remove themselves.
    pub async fn remove_members(
        &self,
        actor: Uuid,
        link_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<usize> {
        let (link, _doc) = self.load_managed(actor, link_id).await?;
        self.require_private(&link)?;
        self.check_member_batch(user_ids.len())?;
        let mut removed = 0;
        let mut seen = HashSet::new();
        for user_id in user_ids.iter().copied().filter(|u| seen.insert(*u)) {
            if self.links.remove_member(link.id, user_id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn list_members(&self, actor: Uuid, link_id: Uuid) -> Result<Vec<ShareLinkMember>> {
        let (link, _doc) = self.load_managed(actor, link_id).await?;
        self.require_private(&link)?;
        let members = self.links.list_members(link.id).await?;
        Ok(members)
    }

    fn require_private(&self, link: &ShareLink) -> Result<()> {
        if link.kind != ShareLinkKind::Private {
            return Err(AccessError::Conflict(
                "membership only applies to private links".into(),
            ));
        }
        Ok(())
    }

    fn check_member_batch(&self, got: usize) -> Result<()> {
        if got == 0 {
            return Err(AccessError::Validation("empty batch".into()));
        }
        if got > self.limits.member_batch_max {
            return Err(AccessError::BatchLimitExceeded {
                got,
                limit: self.limits.member_batch_max,
            });
        }
        Ok(())
    }
}

fn dedupe_users(user_ids: &[Uuid], actor: Uuid) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    user_ids
        .iter()
        .copied()
        .filter(|u| *u != actor && seen.insert(*u))
        .collect()
}

fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(AccessError::Validation(
            "share link password must not be empty".into(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AccessError::Validation(format!("unusable password: {}", e)))
}

/// Argon2 verification compares digests, not plaintext, and is constant
/// time with respect to the supplied password. Any mismatch maps to the
/// same error kind.
fn verify_password(supplied: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AccessError::Store(anyhow::anyhow!("corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(supplied.as_bytes(), &parsed)
        .map_err(|_| AccessError::InvalidPassword)
}
