//! Categories for grouping subscriptions.
//!
//! Categories form a tree through `parent_id`. A category without a parent is
//! a top-level category.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::error::ScheduleError;

/// Identifier of a category.
pub type CategoryId = i64;

/// Name of the catch-all category for uncategorized subscriptions.
pub const DEFAULT_CATEGORY_NAME: &str = "Other";

const MAX_CATEGORY_NAME_LENGTH: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<CategoryId>,
}

impl Category {
    #[must_use]
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            parent_id: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Validate a category against the existing ones before saving it.
///
/// Rejects blank or overlong names, a category that is its own parent, an
/// unknown parent, and parent chains that lead back to the category.
pub fn validate_category(category: &Category, existing: &[Category]) -> Result<()> {
    let invalid = |reason: String| -> crate::error::SubtrackError {
        ScheduleError::InvalidCategory { reason }.into()
    };

    if category.name.trim().is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }
    if category.name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(invalid(format!(
            "name exceeds maximum length of {}",
            MAX_CATEGORY_NAME_LENGTH
        )));
    }

    let Some(requested) = category.parent_id else {
        return Ok(());
    };
    if requested == category.id {
        return Err(invalid("a category cannot be its own parent".to_string()));
    }

    let circular = || invalid(format!("parent {} would create a circular reference", requested));
    let mut seen = HashSet::from([category.id]);
    let mut parent_id = requested;
    loop {
        let Some(parent) = existing.iter().find(|c| c.id == parent_id) else {
            return Err(invalid(format!("parent category {} does not exist", parent_id)));
        };
        if !seen.insert(parent.id) {
            return Err(circular());
        }
        match parent.parent_id {
            Some(next) if next == category.id => return Err(circular()),
            Some(next) => parent_id = next,
            None => return Ok(()),
        }
    }
}

/// Direct children of `parent_id`.
pub fn subcategories(parent_id: CategoryId, categories: &[Category]) -> Vec<&Category> {
    categories
        .iter()
        .filter(|c| c.parent_id == Some(parent_id))
        .collect()
}
