//! Entity types shared by every component: documents, permission grants,
//! share links and the resolved effective permission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Different kinds of documents managed by the store.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentType {
    File,
    Folder,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::File => "File",
            DocumentType::Folder => "Folder",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "File" => Some(DocumentType::File),
            "Folder" => Some(DocumentType::Folder),
            _ => None,
        }
    }
}

/// Lifecycle status. Deleted documents are soft-deleted: excluded from
/// normal queries but recoverable by their owner.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentStatus {
    Active,
    Deleted,
}

/// Permission levels in increasing order of access. The derived `Ord`
/// follows declaration order, so `View < Comment < Edit < Manage < Full`.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Permission {
    View,
    Comment,
    Edit,
    Manage,
    Full,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Comment => "comment",
            Permission::Edit => "edit",
            Permission::Manage => "manage",
            Permission::Full => "full",
        }
    }

    /// Parse a wire-format permission string. Returns `None` for anything
    /// outside the five defined levels; callers treat that as a
    /// validation failure.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Permission::View),
            "comment" => Some(Permission::Comment),
            "edit" => Some(Permission::Edit),
            "manage" => Some(Permission::Manage),
            "full" => Some(Permission::Full),
            _ => None,
        }
    }

    /// The highest level a share link may carry. `Full` stays exclusive
    /// to true ownership.
    pub fn link_ceiling() -> Self {
        Permission::Manage
    }
}

/// The permission actually resolved for a user on a document. Ownership is
/// a tagged variant rather than a synthesized grant row, so owner access
/// can never be mutated through the grant store.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectivePermission {
    Owner,
    Granted(Permission),
    None,
}

impl EffectivePermission {
    pub fn satisfies(&self, required: Permission) -> bool {
        match self {
            EffectivePermission::Owner => true,
            EffectivePermission::Granted(level) => *level >= required,
            EffectivePermission::None => false,
        }
    }

    pub fn level(&self) -> Option<Permission> {
        match self {
            EffectivePermission::Owner => Some(Permission::Full),
            EffectivePermission::Granted(level) => Some(*level),
            EffectivePermission::None => None,
        }
    }

    pub fn has_access(&self) -> bool {
        !matches!(self, EffectivePermission::None)
    }
}

/// A document or folder in the tree. The parent pointer is a weak id
/// reference into the owner's document set, never an owning pointer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub owner: Uuid,
    pub parent_id: Option<Uuid>,
    pub space_id: Option<Uuid>,
    pub sort_order: i64,
    pub starred: bool,
    pub content_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        doc_type: DocumentType,
        owner: Uuid,
        parent_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            doc_type,
            status: DocumentStatus::Active,
            owner,
            parent_id,
            space_id: None,
            sort_order: 0,
            starred: false,
            content_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }
}

/// A stored (document, user) -> level record. At most one row exists per
/// pair; re-granting overwrites in place. The owner never has a row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PermissionGrant {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub level: Permission,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShareLinkKind {
    Public,
    Private,
}

/// A token-bearing capability granting a capped permission to anyone who
/// redeems it. Private links additionally carry a member whitelist.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareLink {
    pub id: Uuid,
    pub token: String,
    pub document_id: Uuid,
    pub kind: ShareLinkKind,
    pub permission: Permission,
    /// Argon2 hash of the link password, when one is set.
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }
}

/// Whitelist entry for a private share link.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareLinkMember {
    pub share_id: Uuid,
    pub user_id: Uuid,
    pub added_at: DateTime<Utc>,
}

/// Metadata captured when a share link is redeemed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShareAccessRecord {
    pub share_id: Uuid,
    pub source_ip: String,
    pub accessed_at: DateTime<Utc>,
}

/// Minimal user record; the core only ever checks existence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_wire_names_parse_back_and_reject_junk() {
        for level in [
            Permission::View,
            Permission::Comment,
            Permission::Edit,
            Permission::Manage,
            Permission::Full,
        ] {
            assert_eq!(Permission::from_str(level.as_str()), Some(level));
        }
        assert_eq!(Permission::from_str("owner"), None);
        assert_eq!(Permission::from_str("View"), None);
        assert_eq!(Permission::from_str(""), None);
    }

    #[test]
    fn document_type_wire_names_parse_back_and_reject_junk() {
        for doc_type in [DocumentType::File, DocumentType::Folder] {
            assert_eq!(DocumentType::from_str(doc_type.as_str()), Some(doc_type));
        }
        assert_eq!(DocumentType::from_str("Space"), None);
    }
}
