use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An application eligible for recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Display name, for example 'Duolingo'.
    #[serde(alias = "appName")]
    pub name: Arc<str>,
    /// Unique within the catalog, for example 'com.duolingo'.
    #[serde(alias = "packageName")]
    pub identifier: Arc<str>,
}

impl CatalogItem {
    pub fn new(name: impl Into<Arc<str>>, identifier: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

/// A past quest choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "targetPackage")]
    pub identifier: Arc<str>,
    #[serde(with = "chrono::serde::ts_milliseconds", alias = "startTime")]
    pub chosen_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(identifier: impl Into<Arc<str>>, chosen_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            chosen_at,
        }
    }
}

/// Feature vector of a catalog item for the duration of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub vector: Vec<f64>,
    /// Index into the current centroids, [None] until the first assignment.
    pub cluster: Option<usize>,
}

impl Document {
    pub fn new(vector: Vec<f64>) -> Self {
        Self {
            vector,
            cluster: None,
        }
    }
}
