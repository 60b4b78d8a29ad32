// src/store/answer_keys.rs

use std::{collections::HashMap, path::Path, sync::Arc};

use validator::Validate;

use crate::{
    error::AppError,
    models::question::{PublicTestDefinition, TestDefinition, TestSummary},
};

/// Catalog bundled with the binary, used when no catalog file is configured.
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Immutable catalog of test definitions and their answer keys.
///
/// Clients only ever receive [`PublicTestDefinition`]s; the full definitions
/// are handed out internally for grading.
#[derive(Debug)]
pub struct AnswerKeyStore {
    tests: HashMap<String, Arc<TestDefinition>>,
    /// Catalog order, for listing.
    order: Vec<String>,
    default_test_id: String,
}

impl AnswerKeyStore {
    /// Builds a store from already parsed definitions.
    ///
    /// Fails if any definition is invalid, two share an id, or the default
    /// test is not part of the catalog.
    pub fn new(
        definitions: Vec<TestDefinition>,
        default_test_id: impl Into<String>,
    ) -> Result<Self, AppError> {
        let default_test_id = default_test_id.into();
        let mut tests = HashMap::with_capacity(definitions.len());
        let mut order = Vec::with_capacity(definitions.len());

        for def in definitions {
            def.validate().map_err(|e| {
                AppError::InternalServerError(format!("Invalid test definition '{}': {}", def.id, e))
            })?;

            if tests.contains_key(&def.id) {
                return Err(AppError::InternalServerError(format!(
                    "Duplicate test id '{}' in catalog",
                    def.id
                )));
            }

            order.push(def.id.clone());
            tests.insert(def.id.clone(), Arc::new(def));
        }

        if !tests.contains_key(&default_test_id) {
            return Err(AppError::InternalServerError(format!(
                "Default test '{}' is not in the catalog",
                default_test_id
            )));
        }

        Ok(Self {
            tests,
            order,
            default_test_id,
        })
    }

    /// Parses a JSON array of test definitions.
    pub fn from_json(raw: &str, default_test_id: impl Into<String>) -> Result<Self, AppError> {
        let definitions: Vec<TestDefinition> = serde_json::from_str(raw)
            .map_err(|e| AppError::InternalServerError(format!("Malformed test catalog: {}", e)))?;
        Self::new(definitions, default_test_id)
    }

    pub fn builtin(default_test_id: impl Into<String>) -> Result<Self, AppError> {
        Self::from_json(BUILTIN_CATALOG, default_test_id)
    }

    pub async fn from_path(
        path: impl AsRef<Path>,
        default_test_id: impl Into<String>,
    ) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::InternalServerError(format!(
                "Failed to read test catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw, default_test_id)
    }

    pub fn default_test_id(&self) -> &str {
        &self.default_test_id
    }

    /// Public projection of the named test, or of the default test when `id` is `None`.
    pub fn public_test(&self, id: Option<&str>) -> Result<PublicTestDefinition, AppError> {
        let id = id.unwrap_or(&self.default_test_id);
        Ok(self.full_test(id)?.public_view())
    }

    /// Full definition including the answer key. Internal use only.
    pub fn full_test(&self, id: &str) -> Result<Arc<TestDefinition>, AppError> {
        self.tests
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Test '{}' not found", id)))
    }

    pub fn list_tests(&self) -> Vec<TestSummary> {
        self.order
            .iter()
            .filter_map(|id| self.tests.get(id))
            .map(|def| def.summary())
            .collect()
    }
}
