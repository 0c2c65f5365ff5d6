//! Keeps the parent-pointer graph a forest. Validation runs against a
//! snapshot of the owner's complete document set, so the ancestor walk is
//! a bounded iteration over a flat id-keyed table and never chases owning
//! pointers.


use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::model::{Document, DocumentType};
use crate::store::DocumentStore;

/// Validate re-parenting `doc` under `proposed_parent`. `snapshot` must be
/// the complete, already-loaded document set of the owner. Moving to the
/// root (`None`) is always structurally valid.
pub fn validate_move(
    doc: &Document,
    proposed_parent: Option<Uuid>,
    snapshot: &[Document],
) -> Result<()> {
    let Some(parent_id) = proposed_parent else {
        return Ok(());
    };
    if parent_id == doc.id {
        return Err(AccessError::Validation(
            "document cannot be its own parent".into(),
        ));
    }
    let by_id: HashMap<Uuid, &Document> = snapshot.iter().map(|d| (d.id, d)).collect();
    let parent = by_id.get(&parent_id).ok_or(AccessError::NotFound)?;
    if parent.doc_type != DocumentType::Folder {
        return Err(AccessError::Validation(
            "cannot nest a document under a file".into(),
        ));
    }
    // Walk the proposed parent's ancestor chain. If the document being
    // moved appears anywhere in it, installing the new pointer would close
    // a loop. The walk is bounded by the snapshot size and fails closed on
    // a pre-existing cycle.
    let mut current = Some(parent_id);
    let mut steps = 0usize;
    while let Some(id) = current {
        if id == doc.id {
            return Err(AccessError::CycleDetected);
        }
        steps += 1;
        if steps > snapshot.len() {
            return Err(AccessError::CycleDetected);
        }
        current = by_id.get(&id).and_then(|d| d.parent_id);
    }
    Ok(())
}

/// Validate attaching a brand-new document under `proposed_parent`. The
/// new document has no children yet, so only the type constraint and the
/// termination of the parent's own ancestor chain matter.
pub fn validate_create(proposed_parent: Uuid, snapshot: &[Document]) -> Result<()> {
    let by_id: HashMap<Uuid, &Document> = snapshot.iter().map(|d| (d.id, d)).collect();
    let parent = by_id.get(&proposed_parent).ok_or(AccessError::NotFound)?;
    if parent.doc_type != DocumentType::Folder {
        return Err(AccessError::Validation(
            "cannot nest a document under a file".into(),
        ));
    }
    let mut current = Some(proposed_parent);
    let mut steps = 0usize;
    while let Some(id) = current {
        steps += 1;
        if steps > snapshot.len() {
            return Err(AccessError::CycleDetected);
        }
        current = by_id.get(&id).and_then(|d| d.parent_id);
    }
    Ok(())
}

/// Convenience wrapper that loads the owner's snapshot from the document
/// store before delegating to the pure validators.
pub struct HierarchyValidator {
    docs: Arc<dyn DocumentStore>,
}

impl HierarchyValidator {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    pub async fn validate_move(
        &self,
        document_id: Uuid,
        proposed_parent: Option<Uuid>,
    ) -> Result<()> {
        let doc = self
            .docs
            .get(document_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        let snapshot = self.docs.list_by_owner(doc.owner).await?;
        validate_move(&doc, proposed_parent, &snapshot)
    }

    pub async fn validate_create(&self, owner: Uuid, proposed_parent: Uuid) -> Result<()> {
        let snapshot = self.docs.list_by_owner(owner).await?;
        validate_create(proposed_parent, &snapshot)
    }
}
