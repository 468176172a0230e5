//! Per-page test data documents.
//!
//! Test data lives next to the locator catalogs as one JSON document per
//! page, grouped by purpose:
//!
//! ```json
//! { "testData": { "userData": { "mobileNumber": "9999999999", "pin": "1234" } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;

#[derive(Error, Debug)]
pub enum TestDataError {
    #[error("Failed to read test data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse test data {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test data group '{0}' not found")]
    GroupNotFound(String),

    #[error("Test data field '{field}' not found in group '{group}'")]
    FieldNotFound { group: String, field: String },
}

/// A page's test data: group name → field name → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    #[serde(default)]
    pub test_data: BTreeMap<String, BTreeMap<String, String>>,
}

impl TestData {
    pub fn from_json_str(json: &str) -> Result<Self, TestDataError> {
        serde_json::from_str(json).map_err(|source| TestDataError::Parse {
            path: PathBuf::new(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TestDataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TestDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| TestDataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `<testDataDirectory>/<page>.json`.
    pub fn for_page(settings: &Settings, page: &str) -> Result<Self, TestDataError> {
        Self::load(settings.test_data_path(page))
    }

    pub fn group(&self, group: &str) -> Result<&BTreeMap<String, String>, TestDataError> {
        self.test_data
            .get(group)
            .ok_or_else(|| TestDataError::GroupNotFound(group.to_string()))
    }

    pub fn field(&self, group: &str, field: &str) -> Result<&str, TestDataError> {
        self.group(group)?
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| TestDataError::FieldNotFound {
                group: group.to_string(),
                field: field.to_string(),
            })
    }
}
