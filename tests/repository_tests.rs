mod fixtures;

use std::sync::Arc;

use fixtures::{account_repository, account_with, sample_account};
use uuid::Uuid;
use viewstore::prelude::*;

#[tokio::test]
async fn create_writes_every_projection_and_read_round_trips() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);
    let account = sample_account();

    let created = repository.create(&account).await.unwrap();
    assert_eq!(created, account);

    assert_eq!(store.view_len("accounts").await, 1);
    assert_eq!(store.view_len("accounts_by_email").await, 1);

    let id = Identifier::single(account.id.unwrap());
    let read = repository.read(&id).await.unwrap();
    assert_eq!(read, account);
}

#[tokio::test]
async fn create_rejects_a_taken_primary_identity() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let id = Uuid::new_v4();
    repository
        .create(&account_with(id, "first@example.com"))
        .await
        .unwrap();

    let err = repository
        .create(&account_with(id, "second@example.com"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate(), "{}", err);

    // The losing create must not leave a partial write in any view.
    assert_eq!(store.view_len("accounts").await, 1);
    assert_eq!(store.view_len("accounts_by_email").await, 1);
}

#[tokio::test]
async fn create_rejects_a_taken_view_identity() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    repository
        .create(&account_with(Uuid::new_v4(), "shared@example.com"))
        .await
        .unwrap();

    let err = repository
        .create(&account_with(Uuid::new_v4(), "shared@example.com"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate(), "{}", err);
    assert_eq!(store.view_len("accounts").await, 1);
}

#[tokio::test]
async fn concurrent_creates_for_one_identity_admit_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let repository = Arc::new(account_repository(store.clone(), CommitStrategy::LoggedBatch));

    let id = Uuid::new_v4();
    let left = {
        let repository = repository.clone();
        let account = account_with(id, "left@example.com");
        tokio::spawn(async move { repository.create(&account).await })
    };
    let right = {
        let repository = repository.clone();
        let account = account_with(id, "right@example.com");
        tokio::spawn(async move { repository.create(&account).await })
    };

    let outcomes = [left.await.unwrap(), right.await.unwrap()];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent create may win");

    // No partial write from the loser under the logged-batch strategy.
    assert_eq!(store.view_len("accounts").await, 1);
    assert_eq!(store.view_len("accounts_by_email").await, 1);
}

#[tokio::test]
async fn update_in_place_keeps_view_identities() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let mut account = sample_account();
    repository.create(&account).await.unwrap();

    account.name = Some("Alice Updated".to_string());
    let updated = repository.update(&account, None).await.unwrap();
    assert_eq!(updated.name.as_deref(), Some("Alice Updated"));

    assert_eq!(store.view_len("accounts").await, 1);
    assert_eq!(store.view_len("accounts_by_email").await, 1);

    let id = Identifier::single(account.id.unwrap());
    let read = repository.read(&id).await.unwrap();
    assert_eq!(read.name.as_deref(), Some("Alice Updated"));
}

#[tokio::test]
async fn update_that_changes_a_view_key_moves_the_row() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let mut account = sample_account();
    repository.create(&account).await.unwrap();
    let old_email = account.email.clone().unwrap();

    account.email = Some("alice@new.example.com".to_string());
    repository.update(&account, None).await.unwrap();

    // Delete-from-old-key plus insert-under-new-key, never an in-place
    // update across a changed key.
    let by_email = store.view_documents("accounts_by_email").await;
    assert_eq!(by_email.len(), 1);
    let stored_key = by_email[0].identifier().unwrap().clone();
    assert_eq!(
        stored_key,
        Identifier::single("alice@new.example.com")
    );
    assert_ne!(stored_key, Identifier::single(old_email));
}

#[tokio::test]
async fn update_with_supplied_original_handles_primary_rekey() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let original = sample_account();
    repository.create(&original).await.unwrap();

    let mut updated = original.clone();
    updated.id = Some(Uuid::new_v4());
    repository.update(&updated, Some(&original)).await.unwrap();

    assert_eq!(store.view_len("accounts").await, 1);
    let id = Identifier::single(updated.id.unwrap());
    assert!(repository.exists(&id).await.unwrap());

    let old_id = Identifier::single(original.id.unwrap());
    assert!(!repository.exists(&old_id).await.unwrap());
}

#[tokio::test]
async fn update_of_a_missing_entity_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store, CommitStrategy::LoggedBatch);

    let err = repository
        .update(&sample_account(), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{}", err);
}

#[tokio::test]
async fn upsert_creates_then_updates() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let mut account = sample_account();
    repository.upsert(&account).await.unwrap();
    assert_eq!(store.view_len("accounts").await, 1);

    account.age = 35;
    repository.upsert(&account).await.unwrap();
    assert_eq!(store.view_len("accounts").await, 1);

    let id = Identifier::single(account.id.unwrap());
    assert_eq!(repository.read(&id).await.unwrap().age, 35);
}

#[tokio::test]
async fn delete_clears_every_projection() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let account = sample_account();
    repository.create(&account).await.unwrap();
    repository.delete(&account).await.unwrap();

    assert_eq!(store.view_len("accounts").await, 0);
    assert_eq!(store.view_len("accounts_by_email").await, 0);
}

#[tokio::test]
async fn delete_by_id_resolves_view_keys_through_a_read() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::LoggedBatch);

    let account = sample_account();
    repository.create(&account).await.unwrap();

    let id = Identifier::single(account.id.unwrap());
    repository.delete_by_id(&id).await.unwrap();

    assert_eq!(store.view_len("accounts").await, 0);
    assert_eq!(store.view_len("accounts_by_email").await, 0);
}

#[tokio::test]
async fn delete_of_a_missing_entity_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store, CommitStrategy::LoggedBatch);

    let err = repository.delete(&sample_account()).await.unwrap_err();
    assert!(err.is_not_found(), "{}", err);
}

#[tokio::test]
async fn read_of_a_missing_identity_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store, CommitStrategy::LoggedBatch);

    let err = repository
        .read(&Identifier::single(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{}", err);
}

#[tokio::test]
async fn exists_reports_presence_without_decoding() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store, CommitStrategy::LoggedBatch);

    let account = sample_account();
    let id = Identifier::single(account.id.unwrap());
    assert!(!repository.exists(&id).await.unwrap());

    repository.create(&account).await.unwrap();
    assert!(repository.exists(&id).await.unwrap());
}

#[tokio::test]
async fn read_in_joins_found_rows_and_drops_missing_ones() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store, CommitStrategy::LoggedBatch);

    let first = account_with(Uuid::new_v4(), "one@example.com");
    let second = account_with(Uuid::new_v4(), "two@example.com");
    repository.create(&first).await.unwrap();
    repository.create(&second).await.unwrap();

    let ids = vec![
        Identifier::single(first.id.unwrap()),
        Identifier::single(Uuid::new_v4()),
        Identifier::single(second.id.unwrap()),
    ];

    let mut found = repository.read_in(&ids).await.unwrap();
    assert_eq!(found.len(), 2);
    found.sort_by(|a, b| a.email.cmp(&b.email));
    assert_eq!(found[0].email.as_deref(), Some("one@example.com"));
    assert_eq!(found[1].email.as_deref(), Some("two@example.com"));
}

#[tokio::test]
async fn crud_works_under_the_async_strategy_too() {
    let store = Arc::new(MemoryStore::new());
    let repository = account_repository(store.clone(), CommitStrategy::Async);

    let account = sample_account();
    repository.create(&account).await.unwrap();
    assert_eq!(store.view_len("accounts").await, 1);
    assert_eq!(store.view_len("accounts_by_email").await, 1);

    repository.delete(&account).await.unwrap();
    assert_eq!(store.view_len("accounts").await, 0);
}

mod observers {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct AuditObserver {
        seen: Mutex<Vec<String>>,
    }

    impl RepositoryObserver for AuditObserver {
        fn before_create(&self, document: &mut Document) {
            document
                .metadata_mut()
                .insert("audited".to_string(), "true".to_string());
            self.seen.lock().unwrap().push("before_create".to_string());
        }

        fn after_create(&self, _document: &Document) {
            self.seen.lock().unwrap().push("after_create".to_string());
        }

        fn before_read(&self, _identifier: &Identifier) {
            self.seen.lock().unwrap().push("before_read".to_string());
        }

        fn after_read(&self, _document: &mut Document) {
            self.seen.lock().unwrap().push("after_read".to_string());
        }
    }

    struct IdentifierRewriter;

    impl RepositoryObserver for IdentifierRewriter {
        fn before_create(&self, document: &mut Document) {
            document.set_identifier(&Identifier::single("hijacked"));
        }
    }

    #[tokio::test]
    async fn observers_run_in_order_and_may_stamp_metadata() {
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(AuditObserver::default());
        let repository: Repository<fixtures::Account> = Repository::builder()
            .registry(fixtures::registry())
            .executor(store.clone())
            .table("accounts", "id:uuid unique")
            .unwrap()
            .view("accounts_by_email", "email:text unique")
            .unwrap()
            .observer(observer.clone())
            .build()
            .unwrap();

        let account = sample_account();
        repository.create(&account).await.unwrap();
        repository
            .read(&Identifier::single(account.id.unwrap()))
            .await
            .unwrap();

        let seen = observer.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec!["before_create", "after_create", "before_read", "after_read"]
        );

        // The metadata stamped before the write survives into the store.
        let stored = store.view_documents("accounts").await;
        assert_eq!(stored[0].metadata().get("audited").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn an_observer_may_not_change_a_document_identifier() {
        let store = Arc::new(MemoryStore::new());
        let repository: Repository<fixtures::Account> = Repository::builder()
            .registry(fixtures::registry())
            .executor(store.clone())
            .table("accounts", "id:uuid unique")
            .unwrap()
            .observer(Arc::new(IdentifierRewriter))
            .build()
            .unwrap();

        let err = repository.create(&sample_account()).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)), "{}", err);
        assert_eq!(store.view_len("accounts").await, 0);
    }
}
