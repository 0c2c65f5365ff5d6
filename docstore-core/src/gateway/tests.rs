#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::config::Limits;
    use crate::error::AccessError;
    use crate::events::EventBus;
    use crate::gateway::AccessGateway;
    use crate::model::{Document, DocumentType, EffectivePermission, Permission};
    use crate::permission::PermissionResolver;
    use crate::store::{MemoryDocumentStore, MemoryGrantStore};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    struct Fixture {
        docs: Arc<MemoryDocumentStore>,
        resolver: Arc<PermissionResolver>,
        gateway: AccessGateway,
    }

    fn fixture() -> Fixture {
        let docs = Arc::new(MemoryDocumentStore::new());
        let grants = Arc::new(MemoryGrantStore::new());
        let clock = Arc::new(FixedClock::new(base_time()));
        let resolver = Arc::new(PermissionResolver::new(
            docs.clone(),
            grants,
            clock,
            EventBus::new(),
            Limits::default(),
        ));
        let gateway = AccessGateway::new(docs.clone(), resolver.clone());
        Fixture {
            docs,
            resolver,
            gateway,
        }
    }

    async fn add_doc(f: &Fixture, owner: Uuid) -> Document {
        let doc = Document::new("doc", DocumentType::Folder, owner, None, base_time());
        f.docs.insert(doc.clone()).await;
        doc
    }

    #[tokio::test]
    async fn ownership_short_circuits_to_full() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let doc = add_doc(&f, owner).await;

        let decision = f
            .gateway
            .check_access(owner, doc.id, Permission::Full)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.effective, EffectivePermission::Owner);
    }

    #[tokio::test]
    async fn grantee_is_allowed_up_to_their_level() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let doc = add_doc(&f, owner).await;
        f.resolver
            .grant(owner, doc.id, user, Permission::Edit)
            .await
            .unwrap();

        let decision = f
            .gateway
            .check_access(user, doc.id, Permission::Edit)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(
            decision.effective,
            EffectivePermission::Granted(Permission::Edit)
        );

        let decision = f
            .gateway
            .check_access(user, doc.id, Permission::Manage)
            .await
            .unwrap();
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn no_grant_means_no_access_not_an_error() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let doc = add_doc(&f, owner).await;

        let decision = f
            .gateway
            .check_access(stranger, doc.id, Permission::View)
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.effective, EffectivePermission::None);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let f = fixture();
        let err = f
            .gateway
            .check_access(Uuid::new_v4(), Uuid::new_v4(), Permission::View)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));
    }

    #[tokio::test]
    async fn deletion_is_invisible_to_non_owners() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let doc = add_doc(&f, owner).await;
        f.resolver
            .grant(owner, doc.id, user, Permission::Manage)
            .await
            .unwrap();
        f.docs.soft_delete(doc.id, base_time()).await.unwrap();

        // even a Manage grantee sees plain not-found
        let err = f
            .gateway
            .check_access(user, doc.id, Permission::View)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));

        // the owner still resolves, so restore remains possible
        let decision = f
            .gateway
            .check_access(owner, doc.id, Permission::Full)
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn require_turns_insufficient_level_into_denied() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let doc = add_doc(&f, owner).await;
        f.resolver
            .grant(owner, doc.id, user, Permission::View)
            .await
            .unwrap();

        let err = f
            .gateway
            .require(user, doc.id, Permission::Edit)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::PermissionDenied));
        // read paths collapse the denial into absence
        assert!(matches!(err.disguise_denial(), AccessError::NotFound));

        let effective = f
            .gateway
            .require(user, doc.id, Permission::View)
            .await
            .unwrap();
        assert_eq!(effective, EffectivePermission::Granted(Permission::View));
    }
}
