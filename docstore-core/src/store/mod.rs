//! Repository collaborator traits consumed by the core, plus in-memory
//! implementations used for tests and for embedding without an external
//! database.
//!
//! Store methods return `anyhow::Result`; the components wrap failures as
//! `AccessError::Store`. Policy decisions (not-found disguising, denial)
//! are never made at this layer.


use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{
    Document, DocumentStatus, PermissionGrant, ShareAccessRecord, ShareLink, ShareLinkMember,
    User,
};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Document>>;
    async fn update(&self, doc: Document) -> Result<()>;
    /// Complete document set of an owner, deleted documents included.
    /// Hierarchy validation needs the full forest; status filtering is the
    /// caller's concern.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Document>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn get(&self, document_id: Uuid, user_id: Uuid) -> Result<Option<PermissionGrant>>;
    /// Insert or overwrite the single row for (document, user). Concurrent
    /// upserts for the same pair must serialize to exactly one writer's
    /// row, never a merge.
    async fn upsert(&self, grant: PermissionGrant) -> Result<()>;
    /// Returns whether a row existed. Deleting an absent row is not an
    /// error.
    async fn delete(&self, document_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<PermissionGrant>>;
}

#[async_trait]
pub trait ShareLinkStore: Send + Sync {
    async fn insert(&self, link: ShareLink) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<ShareLink>>;
    async fn get_by_token(&self, token: &str) -> Result<Option<ShareLink>>;
    async fn update(&self, link: ShareLink) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Increment the view counter and append an access record.
    async fn record_view(&self, id: Uuid, source_ip: &str, at: DateTime<Utc>) -> Result<()>;
    async fn add_member(&self, member: ShareLinkMember) -> Result<()>;
    async fn remove_member(&self, share_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn list_members(&self, share_id: Uuid) -> Result<Vec<ShareLinkMember>>;
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<Uuid, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, doc: Document) {
        self.docs.write().await.insert(doc.id, doc);
    }

    /// Soft-delete: the document stays stored and recoverable.
    pub async fn soft_delete(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("document {} not stored", id))?;
        doc.status = DocumentStatus::Deleted;
        doc.updated_at = now;
        Ok(())
    }

    pub async fn restore(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("document {} not stored", id))?;
        doc.status = DocumentStatus::Active;
        doc.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    async fn update(&self, doc: Document) -> Result<()> {
        self.docs.write().await.insert(doc.id, doc);
        Ok(())
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Document>> {
        Ok(self
            .docs
            .read()
            .await
            .values()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryGrantStore {
    grants: RwLock<HashMap<(Uuid, Uuid), PermissionGrant>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.grants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.grants.read().await.is_empty()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn get(&self, document_id: Uuid, user_id: Uuid) -> Result<Option<PermissionGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .get(&(document_id, user_id))
            .cloned())
    }

    async fn upsert(&self, grant: PermissionGrant) -> Result<()> {
        // single write-lock section keeps the upsert atomic per pair
        self.grants
            .write()
            .await
            .insert((grant.document_id, grant.user_id), grant);
        Ok(())
    }

    async fn delete(&self, document_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .grants
            .write()
            .await
            .remove(&(document_id, user_id))
            .is_some())
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .values()
            .filter(|g| g.document_id == document_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryShareLinkStore {
    links: RwLock<HashMap<Uuid, ShareLink>>,
    members: RwLock<HashMap<Uuid, Vec<ShareLinkMember>>>,
    access_log: RwLock<Vec<ShareAccessRecord>>,
}

impl MemoryShareLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn access_log(&self) -> Vec<ShareAccessRecord> {
        self.access_log.read().await.clone()
    }
}

#[async_trait]
impl ShareLinkStore for MemoryShareLinkStore {
    async fn insert(&self, link: ShareLink) -> Result<()> {
        self.links.write().await.insert(link.id, link);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ShareLink>> {
        Ok(self.links.read().await.get(&id).cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<ShareLink>> {
        Ok(self
            .links
            .read()
            .await
            .values()
            .find(|l| l.token == token)
            .cloned())
    }

    async fn update(&self, link: ShareLink) -> Result<()> {
        self.links.write().await.insert(link.id, link);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.members.write().await.remove(&id);
        Ok(self.links.write().await.remove(&id).is_some())
    }

    async fn record_view(&self, id: Uuid, source_ip: &str, at: DateTime<Utc>) -> Result<()> {
        let mut links = self.links.write().await;
        let link = links
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("share link {} not stored", id))?;
        link.view_count += 1;
        self.access_log.write().await.push(ShareAccessRecord {
            share_id: id,
            source_ip: source_ip.to_string(),
            accessed_at: at,
        });
        Ok(())
    }

    async fn add_member(&self, member: ShareLinkMember) -> Result<()> {
        let mut members = self.members.write().await;
        let list = members.entry(member.share_id).or_default();
        if !list.iter().any(|m| m.user_id == member.user_id) {
            list.push(member);
        }
        Ok(())
    }

    async fn remove_member(&self, share_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut members = self.members.write().await;
        let Some(list) = members.get_mut(&share_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|m| m.user_id != user_id);
        Ok(list.len() < before)
    }

    async fn list_members(&self, share_id: Uuid) -> Result<Vec<ShareLinkMember>> {
        Ok(self
            .members
            .read()
            .await
            .get(&share_id)
            .cloned()
            .unwrap_or_default())
    }
}
