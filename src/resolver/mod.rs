//! Generic CRUD resolvers over the document store.
//!
//! One factory ([`CrudResolver`]) serves every entity; entity-specific
//! rules (the case integrity checks) are layered on by composition in
//! [`case::CaseResolver`], never by duplicating the mapping.

pub mod case;
pub mod integrity;

pub use case::CaseResolver;
pub use integrity::{IntegrityChecker, IntegrityViolation};

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::db::{Collection, Document, DocumentStore, Filter, FindOptions, Projection, StoreError, UpdateSpec};
use crate::models::{Case, CaseInput, Doctor, DoctorInput, Patient, PatientInput};

#[derive(Error, Debug)]
pub enum ResolverError {
    /// Domain-level violation: the write was refused, nothing changed.
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),

    /// Infrastructure failure in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Document does not match entity shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// An entity family mapped onto one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    type Input: Serialize + Send + Sync + 'static;
}

impl Entity for Patient {
    const COLLECTION: &'static str = crate::models::PATIENTS;
    type Input = PatientInput;
}

impl Entity for Doctor {
    const COLLECTION: &'static str = crate::models::DOCTORS;
    type Input = DoctorInput;
}

impl Entity for Case {
    const COLLECTION: &'static str = crate::models::CASES;
    type Input = CaseInput;
}

/// Query/insert/update/delete with uniform semantics for one entity.
#[derive(Clone)]
pub struct CrudResolver<E: Entity> {
    store: DocumentStore,
    _entity: PhantomData<E>,
}

impl<E: Entity> CrudResolver<E> {
    pub fn new(store: DocumentStore) -> Self {
        CrudResolver {
            store,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.store.collection(E::COLLECTION)
    }

    /// Raw query: opaque-to-this-layer filter, options and projection go
    /// straight to the store. No implicit limit.
    pub async fn query(
        &self,
        filter: &Filter,
        options: &FindOptions,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, ResolverError> {
        Ok(self.collection().find(filter, options, projection)?)
    }

    /// Query returning typed entities (full documents, no projection).
    pub async fn query_typed(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<E>, ResolverError> {
        self.query(filter, options, None)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(ResolverError::from))
            .collect()
    }

    /// Insert exactly one document built from a validated input.
    pub async fn insert(&self, input: &E::Input) -> Result<E, ResolverError> {
        let doc = match serde_json::to_value(input)? {
            Value::Object(map) => map,
            other => {
                return Err(ResolverError::Store(StoreError::Corrupt(format!(
                    "entity input must serialize to an object, got {other}"
                ))))
            }
        };
        let stored = self.collection().insert_one(doc)?;
        Ok(serde_json::from_value(Value::Object(stored))?)
    }

    /// Bulk update: apply `update` to every match. Returns modified count.
    pub async fn update(&self, filter: &Filter, update: &UpdateSpec) -> Result<u64, ResolverError> {
        Ok(self.collection().update_many(filter, update)?)
    }

    /// Bulk delete. Returns deleted count.
    pub async fn delete(&self, filter: &Filter) -> Result<u64, ResolverError> {
        Ok(self.collection().delete_many(filter)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn patient_input(name: &str) -> PatientInput {
        PatientInput {
            name: name.into(),
            firstname: "Jane".into(),
            middlename: None,
            birthdate: NaiveDate::from_ymd_opt(1975, 1, 30).unwrap(),
            gender: "f".into(),
        }
    }

    #[tokio::test]
    async fn insert_then_query_roundtrip() {
        let store = DocumentStore::open_in_memory().unwrap();
        let resolver = CrudResolver::<Patient>::new(store);

        let inserted = resolver.insert(&patient_input("Doe")).await.unwrap();
        assert!(!inserted.id.is_empty());

        let found = resolver
            .query_typed(&Filter::eq("name", "Doe"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inserted.id);
        assert_eq!(found[0].birthdate, inserted.birthdate);
    }

    #[tokio::test]
    async fn update_returns_modified_count() {
        let store = DocumentStore::open_in_memory().unwrap();
        let resolver = CrudResolver::<Patient>::new(store);
        resolver.insert(&patient_input("Doe")).await.unwrap();
        resolver.insert(&patient_input("Roe")).await.unwrap();

        let modified = resolver
            .update(
                &Filter::eq("name", "Doe"),
                &UpdateSpec::set_field("gender", "m"),
            )
            .await
            .unwrap();
        assert_eq!(modified, 1);
    }

    #[tokio::test]
    async fn delete_returns_deleted_count() {
        let store = DocumentStore::open_in_memory().unwrap();
        let resolver = CrudResolver::<Patient>::new(store);
        resolver.insert(&patient_input("Doe")).await.unwrap();
        resolver.insert(&patient_input("Doe")).await.unwrap();

        let deleted = resolver.delete(&Filter::eq("name", "Doe")).await.unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn projection_passes_through_to_store() {
        let store = DocumentStore::open_in_memory().unwrap();
        let resolver = CrudResolver::<Patient>::new(store);
        resolver.insert(&patient_input("Doe")).await.unwrap();

        let docs = resolver
            .query(
                &Filter::All,
                &FindOptions::default(),
                Some(&Projection::new(["name"])),
            )
            .await
            .unwrap();
        assert_eq!(docs[0].len(), 2);
        assert_eq!(docs[0].get("name"), Some(&json!("Doe")));
    }
}
