mod fixtures;

use std::sync::Arc;

use fixtures::{account_descriptor, registry, sample_account, Account, Address};
use viewstore::prelude::*;

fn factory() -> DocumentFactory {
    DocumentFactory::new(registry(), Arc::new(MessagePackCodec::new()))
}

#[test]
fn encode_decode_round_trip_covers_all_field_kinds() {
    let codec = MessagePackCodec::new();
    let descriptor = account_descriptor();
    let account = sample_account();

    let bytes = codec.encode(&account, &descriptor).unwrap();
    let decoded = codec.decode(&bytes, &descriptor).unwrap();
    let decoded = decoded.downcast::<Account>().unwrap();

    assert_eq!(*decoded, account);
}

#[test]
fn encoding_is_deterministic_for_an_unchanged_entity() {
    let codec = MessagePackCodec::new();
    let descriptor = account_descriptor();
    let account = sample_account();

    let first = codec.encode(&account, &descriptor).unwrap();
    let second = codec.encode(&account, &descriptor).unwrap();
    assert_eq!(first, second);
}

#[test]
fn primitive_fields_keep_zero_defaults_when_never_set() {
    let codec = MessagePackCodec::new();
    let descriptor = account_descriptor();

    let bytes = codec.encode(&Account::default(), &descriptor).unwrap();
    let decoded = codec.decode(&bytes, &descriptor).unwrap();
    let decoded = decoded.downcast::<Account>().unwrap();

    assert_eq!(decoded.age, 0);
    assert!(!decoded.active);
    assert_eq!(decoded.id, None);
    assert_eq!(decoded.address, None);
}

#[test]
fn unknown_field_names_are_skipped_on_decode() {
    let descriptor = account_descriptor();
    let codec = MessagePackCodec::new();

    // A payload written by a schema that knows one more field than we do.
    let pairs: Vec<(String, Value)> = vec![
        ("id".to_string(), Value::Null),
        ("name".to_string(), Value::Text("Bob".to_string())),
        ("legacy_score".to_string(), Value::Integer(99)),
        ("age".to_string(), Value::Integer(7)),
    ];
    let bytes = rmp_serde::to_vec(&pairs).unwrap();

    let decoded = codec.decode(&bytes, &descriptor).unwrap();
    let decoded = decoded.downcast::<Account>().unwrap();
    assert_eq!(decoded.name.as_deref(), Some("Bob"));
    assert_eq!(decoded.age, 7);
}

#[test]
fn nested_references_round_trip() {
    let codec = MessagePackCodec::new();
    let descriptor = account_descriptor();

    let mut account = sample_account();
    account.address = Some(Address {
        city: Some("Porto".to_string()),
        zip: None,
    });

    let bytes = codec.encode(&account, &descriptor).unwrap();
    let decoded = codec.decode(&bytes, &descriptor).unwrap();
    let decoded = decoded.downcast::<Account>().unwrap();

    let address = decoded.address.as_ref().unwrap();
    assert_eq!(address.city.as_deref(), Some("Porto"));
    assert_eq!(address.zip, None);
}

#[test]
fn factory_builds_documents_with_identity_and_tag() {
    let factory = factory();
    let key = KeyDefinition::parse("id:uuid").unwrap();
    let account = sample_account();

    let document = factory.as_document(&account, &key).unwrap();

    assert!(document.has_identifier());
    assert_eq!(document.type_tag(), "account");
    assert_eq!(
        document.identifier().unwrap().components()[0],
        Value::Uuid(account.id.unwrap())
    );
    assert!(!document.payload().is_empty());
}

#[test]
fn factory_reuses_precomputed_payload_across_views() {
    let factory = factory();
    let by_id = KeyDefinition::parse("id:uuid").unwrap();
    let by_email = KeyDefinition::parse("email:text").unwrap();
    let account = sample_account();

    let payload = factory.encode_payload(&account).unwrap();
    let primary = factory
        .as_document_with_payload(&account, &by_id, payload.clone())
        .unwrap();
    let view = factory
        .as_document_with_payload(&account, &by_email, payload)
        .unwrap();

    assert_eq!(primary.payload(), view.payload());
    assert_ne!(primary.identifier(), view.identifier());
}

#[test]
fn factory_decodes_back_through_the_registry_tag() {
    let factory = factory();
    let key = KeyDefinition::parse("id:uuid").unwrap();
    let account = sample_account();

    let document = factory.as_document(&account, &key).unwrap();
    let decoded: Account = factory.as_entity(&document).unwrap();
    assert_eq!(decoded, account);
}

#[test]
fn decoding_as_the_wrong_type_fails() {
    let factory = factory();
    let key = KeyDefinition::parse("id:uuid").unwrap();
    let document = factory.as_document(&sample_account(), &key).unwrap();

    let result: Result<Address> = factory.as_entity(&document);
    assert!(matches!(result, Err(StoreError::Descriptor(_))));
}

#[test]
fn unregistered_tag_is_a_descriptor_error() {
    let factory = factory();
    let document = Document::new("ghost", Vec::new());

    let result: Result<Account> = factory.as_entity(&document);
    assert!(matches!(result, Err(StoreError::Descriptor(_))));
}

#[test]
fn touch_refreshes_only_the_update_timestamp() {
    let mut document = Document::new("account", vec![1]);
    let created = document.created_at();
    let updated = document.updated_at();

    std::thread::sleep(std::time::Duration::from_millis(2));
    document.touch();

    assert_eq!(document.created_at(), created);
    assert!(document.updated_at() > updated);
}
