//! Case mutations: the generic resolver wrapped with integrity checks.
//!
//! Inserts verify, in order: patient exists, (case_no, patient) pair is
//! free, surgeon exists (if supplied), first assist exists (if supplied).
//! The first violated invariant wins and nothing is written. Reference
//! ids are stored canonically so the pair check has one spelling to
//! match. Updates re-check whichever reference fields the assignment
//! touches against the new values and refuse to unset required fields;
//! the pair-uniqueness check is not re-run on update (a bulk update has
//! no single target pair — see DESIGN.md).

use serde_json::Value;

use crate::db::{Document, DocumentStore, Filter, FindOptions, Projection, UpdateSpec};
use crate::models::{Case, CaseInput, CASES, DOCTORS, PATIENTS};

use super::integrity::{canonical_id, IntegrityChecker, IntegrityViolation};
use super::{CrudResolver, ResolverError};

/// Case fields every stored document must carry; an update may not
/// remove them.
const REQUIRED_FIELDS: [&str; 3] = ["case_no", "patient_id", "pre_diagnosis"];

#[derive(Clone)]
pub struct CaseResolver {
    crud: CrudResolver<Case>,
    checker: IntegrityChecker,
}

impl CaseResolver {
    pub fn new(store: DocumentStore) -> Self {
        CaseResolver {
            crud: CrudResolver::new(store.clone()),
            checker: IntegrityChecker::new(store),
        }
    }

    pub async fn query(
        &self,
        filter: &Filter,
        options: &FindOptions,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, ResolverError> {
        self.crud.query(filter, options, projection).await
    }

    pub async fn query_typed(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Case>, ResolverError> {
        self.crud.query_typed(filter, options).await
    }

    /// Insert one case after all integrity checks pass.
    pub async fn insert(&self, input: &CaseInput) -> Result<Case, ResolverError> {
        if !self
            .checker
            .exists_by_id(&input.patient_id, PATIENTS)
            .await?
        {
            return Err(IntegrityViolation::UnknownPatient.into());
        }
        if self
            .checker
            .case_no_taken(input.case_no, &input.patient_id, CASES)
            .await?
        {
            return Err(IntegrityViolation::DuplicateCaseNo.into());
        }
        if let Some(surgeon) = &input.surgeon_id {
            if !self.checker.exists_by_id(surgeon, DOCTORS).await? {
                return Err(IntegrityViolation::UnknownSurgeon.into());
            }
        }
        if let Some(assist) = &input.first_assist_id {
            if !self.checker.exists_by_id(assist, DOCTORS).await? {
                return Err(IntegrityViolation::UnknownFirstAssist.into());
            }
        }

        // Store references in their canonical spelling so the
        // (case_no, patient) pair has exactly one representation.
        let mut input = input.clone();
        input.patient_id = canonical_id(&input.patient_id);
        input.surgeon_id = input.surgeon_id.as_deref().map(canonical_id);
        input.first_assist_id = input.first_assist_id.as_deref().map(canonical_id);
        self.crud.insert(&input).await
    }

    /// Bulk update. Reference fields present in the assignment are checked
    /// against their new values, and required fields may not be unset;
    /// nothing is written until every check passes.
    pub async fn update(&self, filter: &Filter, update: &UpdateSpec) -> Result<u64, ResolverError> {
        for field in &update.unset {
            if REQUIRED_FIELDS.contains(&field.as_str()) {
                return Err(IntegrityViolation::RequiredField(field.clone()).into());
            }
        }
        self.check_reference(update, "patient_id", PATIENTS, IntegrityViolation::UnknownPatient)
            .await?;
        self.check_reference(update, "surgeon_id", DOCTORS, IntegrityViolation::UnknownSurgeon)
            .await?;
        self.check_reference(
            update,
            "first_assist_id",
            DOCTORS,
            IntegrityViolation::UnknownFirstAssist,
        )
        .await?;
        self.crud.update(filter, update).await
    }

    pub async fn delete(&self, filter: &Filter) -> Result<u64, ResolverError> {
        self.crud.delete(filter).await
    }

    async fn check_reference(
        &self,
        update: &UpdateSpec,
        field: &str,
        collection: &str,
        violation: IntegrityViolation,
    ) -> Result<(), ResolverError> {
        let Some(value) = update.set.get(field) else {
            return Ok(());
        };
        // A non-string reference cannot resolve to a stored id.
        let exists = match value {
            Value::String(id) => self.checker.exists_by_id(id, collection).await?,
            _ => false,
        };
        if exists {
            Ok(())
        } else {
            Err(violation.into())
        }
    }
}
