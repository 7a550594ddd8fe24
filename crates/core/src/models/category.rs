//! Product categories.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Slug};

/// A product category. Names and slugs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}
