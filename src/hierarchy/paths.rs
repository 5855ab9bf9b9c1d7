//! Slug rules and materialized path arithmetic.
//!
//! A node's `path` is the slash-joined chain of slugs from its root down to
//! itself (`/marketing/salon`) and its `level` is the number of ancestors.

use super::error::HierarchyError;
use crate::tables::TaxonomyNode;
use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_SLUG_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 100;
pub const PATH_SEPARATOR: char = '/';

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
}

pub fn validate_slug(slug: &str) -> Result<(), HierarchyError> {
    if slug.is_empty() {
        return Err(HierarchyError::Validation("slug is required".to_string()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(HierarchyError::Validation(format!(
            "slug must be at most {MAX_SLUG_LEN} characters"
        )));
    }
    if !SLUG_REGEX.is_match(slug) {
        return Err(HierarchyError::Validation(format!(
            "slug '{slug}' may only contain lowercase letters, digits and '-'"
        )));
    }
    Ok(())
}

/// Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<String, HierarchyError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::Validation("name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(HierarchyError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Where a node sits in its forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub path: String,
    pub level: i32,
}

impl Placement {
    pub fn root(slug: &str) -> Self {
        Self {
            path: format!("{PATH_SEPARATOR}{slug}"),
            level: 0,
        }
    }

    /// Placement of a child called `slug` under a parent placed at `self`.
    pub fn child(&self, slug: &str) -> Self {
        Self {
            path: format!("{}{PATH_SEPARATOR}{slug}", self.path),
            level: self.level + 1,
        }
    }

    pub fn of(node: &TaxonomyNode) -> Self {
        Self {
            path: node.path.clone(),
            level: node.level,
        }
    }

    pub fn under(parent: Option<&TaxonomyNode>, slug: &str) -> Self {
        match parent {
            Some(parent) => Placement::of(parent).child(slug),
            None => Placement::root(slug),
        }
    }

    pub fn matches(&self, node: &TaxonomyNode) -> bool {
        self.path == node.path && self.level == node.level
    }
}

/// Normalises a user supplied path lookup: adds the leading separator and
/// drops a trailing one.
pub fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(PATH_SEPARATOR);
    if trimmed.starts_with(PATH_SEPARATOR) {
        trimmed.to_string()
    } else {
        format!("{PATH_SEPARATOR}{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("marketing").is_ok());
        assert!(validate_slug("salon-2024").is_ok());

        for bad in ["", "Marketing", "with space", "a/b", "über", "under_score"] {
            assert!(
                matches!(validate_slug(bad), Err(HierarchyError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }

        let too_long = "a".repeat(MAX_SLUG_LEN + 1);
        assert!(validate_slug(&too_long).is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Salon ").unwrap(), "Salon");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_placement_chain() {
        let a = Placement::root("a");
        assert_eq!(a.path, "/a");
        assert_eq!(a.level, 0);

        let b = a.child("b");
        assert_eq!(b.path, "/a/b");
        assert_eq!(b.level, 1);

        let c = b.child("c");
        assert_eq!(c.path, "/a/b/c");
        assert_eq!(c.level, 2);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("marketing/salon"), "/marketing/salon");
        assert_eq!(normalize_path("/marketing/salon/"), "/marketing/salon");
        assert_eq!(normalize_path("/a"), "/a");
    }
}
