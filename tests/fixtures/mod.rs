//! Shared test entities and descriptor registrations.
#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;
use viewstore::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub city: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub age: i64,
    pub active: bool,
    pub address: Option<Address>,
    pub attributes: Option<serde_json::Value>,
}

pub fn address_descriptor() -> Arc<EntityDescriptor> {
    EntityDescriptor::builder::<Address>("address")
        .scalar(
            "city",
            DataType::Text,
            |a: &Address| a.city.clone().map(Value::Text),
            |a, v| {
                if let Value::Text(s) = v {
                    a.city = Some(s);
                }
                Ok(())
            },
        )
        .scalar(
            "zip",
            DataType::Text,
            |a: &Address| a.zip.clone().map(Value::Text),
            |a, v| {
                if let Value::Text(s) = v {
                    a.zip = Some(s);
                }
                Ok(())
            },
        )
        .build()
        .unwrap()
}

pub fn account_descriptor() -> Arc<EntityDescriptor> {
    EntityDescriptor::builder::<Account>("account")
        .scalar(
            "id",
            DataType::Uuid,
            |a: &Account| a.id.map(Value::Uuid),
            |a, v| {
                if let Value::Uuid(id) = v {
                    a.id = Some(id);
                }
                Ok(())
            },
        )
        .scalar(
            "email",
            DataType::Text,
            |a: &Account| a.email.clone().map(Value::Text),
            |a, v| {
                if let Value::Text(s) = v {
                    a.email = Some(s);
                }
                Ok(())
            },
        )
        .scalar(
            "name",
            DataType::Text,
            |a: &Account| a.name.clone().map(Value::Text),
            |a, v| {
                if let Value::Text(s) = v {
                    a.name = Some(s);
                }
                Ok(())
            },
        )
        .scalar(
            "age",
            DataType::BigInt,
            |a: &Account| Some(Value::Integer(a.age)),
            |a, v| {
                if let Value::Integer(n) = v {
                    a.age = n;
                }
                Ok(())
            },
        )
        .scalar(
            "active",
            DataType::Boolean,
            |a: &Account| Some(Value::Boolean(a.active)),
            |a, v| {
                if let Value::Boolean(b) = v {
                    a.active = b;
                }
                Ok(())
            },
        )
        .reference::<Address, _, _>(
            "address",
            address_descriptor(),
            |a: &Account| a.address.as_ref(),
            |a, child| {
                a.address = Some(child);
                Ok(())
            },
        )
        .opaque(
            "attributes",
            |a: &Account| a.attributes.clone(),
            |a, json| {
                a.attributes = Some(json);
                Ok(())
            },
        )
        .build()
        .unwrap()
}

pub fn registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register(address_descriptor()).unwrap();
    registry.register(account_descriptor()).unwrap();
    Arc::new(registry)
}

pub fn sample_account() -> Account {
    Account {
        id: Some(Uuid::new_v4()),
        email: Some("alice@example.com".to_string()),
        name: Some("Alice".to_string()),
        age: 34,
        active: true,
        address: Some(Address {
            city: Some("Lisbon".to_string()),
            zip: Some("1100-148".to_string()),
        }),
        attributes: Some(serde_json::json!({"tier": "gold", "flags": [1, 2]})),
    }
}

pub fn account_with(id: Uuid, email: &str) -> Account {
    Account {
        id: Some(id),
        email: Some(email.to_string()),
        name: Some("Test".to_string()),
        age: 1,
        active: true,
        address: None,
        attributes: None,
    }
}

/// A repository over a fresh in-memory store: primary table keyed by id,
/// one unique view keyed by email.
pub fn account_repository(
    store: Arc<MemoryStore>,
    strategy: CommitStrategy,
) -> Repository<Account> {
    Repository::builder()
        .registry(registry())
        .executor(store)
        .commit_strategy(strategy)
        .table("accounts", "id:uuid unique")
        .unwrap()
        .view("accounts_by_email", "email:text unique")
        .unwrap()
        .build()
        .unwrap()
}
