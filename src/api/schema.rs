//! GraphQL schema: one query/mutation family per entity, all backed by
//! the same resolver machinery. Filters and update specs travel as JSON
//! scalars so the full filter tree is available to clients.

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Json, Object, Schema};

use crate::db::{DocumentStore, Filter, FindOptions, UpdateSpec};
use crate::models::{Case, CaseInput, Doctor, DoctorInput, Patient, PatientInput};
use crate::resolver::{CaseResolver, CrudResolver, ResolverError};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// The resolver set shared by every field, stored as schema data.
pub struct Resolvers {
    pub patients: CrudResolver<Patient>,
    pub doctors: CrudResolver<Doctor>,
    pub cases: CaseResolver,
}

pub fn build_schema(store: DocumentStore) -> AppSchema {
    let resolvers = Resolvers {
        patients: CrudResolver::new(store.clone()),
        doctors: CrudResolver::new(store.clone()),
        cases: CaseResolver::new(store),
    };
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(resolvers)
        .finish()
}

fn find_options(limit: Option<u64>, skip: Option<u64>) -> FindOptions {
    FindOptions { limit, skip }
}

fn unwrap_filter(filter: Option<Json<Filter>>) -> Filter {
    filter.map(|json| json.0).unwrap_or_default()
}

/// Map resolver failures onto GraphQL errors with a machine-readable
/// `code` extension. Storage details stay server-side.
fn to_gql_error(err: ResolverError) -> async_graphql::Error {
    match err {
        ResolverError::Integrity(violation) => {
            violation.extend_with(|_, ext| ext.set("code", "INTEGRITY_VIOLATION"))
        }
        ResolverError::Store(crate::db::StoreError::InvalidFilter(inner)) => {
            inner.extend_with(|_, ext| ext.set("code", "BAD_REQUEST"))
        }
        other => {
            tracing::error!(error = %other, "Resolver failed");
            async_graphql::Error::new("Internal server error")
                .extend_with(|_, ext| ext.set("code", "INTERNAL"))
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn patients(
        &self,
        ctx: &Context<'_>,
        filter: Option<Json<Filter>>,
        limit: Option<u64>,
        skip: Option<u64>,
    ) -> async_graphql::Result<Vec<Patient>> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .patients
            .query_typed(&unwrap_filter(filter), &find_options(limit, skip))
            .await
            .map_err(to_gql_error)
    }

    async fn doctors(
        &self,
        ctx: &Context<'_>,
        filter: Option<Json<Filter>>,
        limit: Option<u64>,
        skip: Option<u64>,
    ) -> async_graphql::Result<Vec<Doctor>> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .doctors
            .query_typed(&unwrap_filter(filter), &find_options(limit, skip))
            .await
            .map_err(to_gql_error)
    }

    async fn cases(
        &self,
        ctx: &Context<'_>,
        filter: Option<Json<Filter>>,
        limit: Option<u64>,
        skip: Option<u64>,
    ) -> async_graphql::Result<Vec<Case>> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .cases
            .query_typed(&unwrap_filter(filter), &find_options(limit, skip))
            .await
            .map_err(to_gql_error)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn insert_patient(
        &self,
        ctx: &Context<'_>,
        input: PatientInput,
    ) -> async_graphql::Result<Patient> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.patients.insert(&input).await.map_err(to_gql_error)
    }

    async fn update_patients(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
        update: Json<UpdateSpec>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .patients
            .update(&filter.0, &update.0)
            .await
            .map_err(to_gql_error)
    }

    async fn delete_patients(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.patients.delete(&filter.0).await.map_err(to_gql_error)
    }

    async fn insert_doctor(
        &self,
        ctx: &Context<'_>,
        input: DoctorInput,
    ) -> async_graphql::Result<Doctor> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.doctors.insert(&input).await.map_err(to_gql_error)
    }

    async fn update_doctors(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
        update: Json<UpdateSpec>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .doctors
            .update(&filter.0, &update.0)
            .await
            .map_err(to_gql_error)
    }

    async fn delete_doctors(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.doctors.delete(&filter.0).await.map_err(to_gql_error)
    }

    async fn insert_case(
        &self,
        ctx: &Context<'_>,
        input: CaseInput,
    ) -> async_graphql::Result<Case> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.cases.insert(&input).await.map_err(to_gql_error)
    }

    async fn update_cases(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
        update: Json<UpdateSpec>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers
            .cases
            .update(&filter.0, &update.0)
            .await
            .map_err(to_gql_error)
    }

    async fn delete_cases(
        &self,
        ctx: &Context<'_>,
        filter: Json<Filter>,
    ) -> async_graphql::Result<u64> {
        let resolvers = ctx.data_unchecked::<Resolvers>();
        resolvers.cases.delete(&filter.0).await.map_err(to_gql_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AppSchema {
        build_schema(DocumentStore::open_in_memory().unwrap())
    }

    async fn insert_patient(schema: &AppSchema) -> String {
        let response = schema
            .execute(
                r#"mutation {
                    insertPatient(input: {
                        name: "Doe", firstname: "Jane",
                        birthdate: "1980-04-02", gender: "f"
                    }) { id }
                }"#,
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        data["insertPatient"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn insert_and_query_patient() {
        let schema = schema();
        insert_patient(&schema).await;

        let response = schema
            .execute(r#"{ patients { name firstname birthdate } }"#)
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(data["patients"][0]["name"], "Doe");
        assert_eq!(data["patients"][0]["birthdate"], "1980-04-02");
    }

    #[tokio::test]
    async fn filter_tree_narrows_results() {
        let schema = schema();
        insert_patient(&schema).await;
        let response = schema
            .execute(
                r#"{ patients(filter: {eq: {field: "name", value: "Nope"}}) { id } }"#,
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(data["patients"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn case_without_patient_reports_integrity_violation() {
        let schema = schema();
        let response = schema
            .execute(
                r#"mutation {
                    insertCase(input: {
                        caseNo: 1,
                        patientId: "0e3b8a54-3c1e-4c06-8a8e-000000000000",
                        preDiagnosis: "hernia"
                    }) { id }
                }"#,
            )
            .await;
        assert_eq!(response.errors.len(), 1);
        let error = &response.errors[0];
        assert_eq!(error.message, "Referenced patient does not exist");
        let extensions = error.extensions.as_ref().unwrap();
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("INTEGRITY_VIOLATION"))
        );
    }

    #[tokio::test]
    async fn update_and_delete_report_counts() {
        let schema = schema();
        insert_patient(&schema).await;

        let response = schema
            .execute(
                r#"mutation {
                    updatePatients(
                        filter: {eq: {field: "name", value: "Doe"}},
                        update: {set: {name: "Roe"}}
                    )
                }"#,
            )
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(response.data.into_json().unwrap()["updatePatients"], 1);

        let response = schema
            .execute(r#"mutation { deletePatients(filter: "all") }"#)
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(response.data.into_json().unwrap()["deletePatients"], 1);
    }
}
