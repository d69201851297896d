//! Two-level category hierarchy.
//!
//! A category either is a root or hangs off a root. The depth limit is
//! checked whenever a category is written rather than encoded in types.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::Category;

/// Why a proposed parent assignment is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The parent id does not exist.
    #[error("parent category {0} does not exist")]
    UnknownParent(String),
    /// A category cannot be its own parent.
    #[error("a category cannot be its own parent")]
    SelfParent,
    /// The parent is itself nested.
    #[error("parent category {0} is not a root category")]
    NestedParent(String),
    /// The parent has been deleted.
    #[error("parent category {0} has been deleted")]
    DeletedParent(String),
    /// The category already has children, so it must stay a root.
    #[error("category {0} has sub-categories and must remain a root")]
    HasChildren(String),
}

/// Label shown for a category: `"{name} - General"` for roots and
/// `"{parent} - {name}"` for children.
#[must_use]
pub fn display_name(category: &Category, parent: Option<&Category>) -> String {
    parent.map_or_else(
        || format!("{} - General", category.name),
        |p| format!("{} - {}", p.name, category.name),
    )
}

/// Snapshot of every category, deleted ones included, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    by_id: HashMap<String, Category>,
}

impl CategoryTree {
    /// Index a list of categories.
    #[must_use]
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            by_id: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// Look up a category.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Category> { self.by_id.get(id) }

    /// Parent of `category`, when it has one.
    #[must_use]
    pub fn parent_of(&self, category: &Category) -> Option<&Category> {
        category
            .parent_category_id
            .as_deref()
            .and_then(|id| self.by_id.get(id))
    }

    /// Display label for `category`.
    #[must_use]
    pub fn display_name(&self, category: &Category) -> String {
        display_name(category, self.parent_of(category))
    }

    /// Display label for a category id; unknown ids render as the id.
    #[must_use]
    pub fn display_name_of(&self, id: &str) -> String {
        self.get(id)
            .map_or_else(|| id.to_owned(), |category| self.display_name(category))
    }

    /// Categories that are not soft-deleted, in unspecified order.
    pub fn live(&self) -> impl Iterator<Item = &Category> {
        self.by_id.values().filter(|c| !c.deleted)
    }

    /// Whether `username` owns the category or its parent.
    #[must_use]
    pub fn is_owned_by(&self, category_id: &str, username: &str) -> bool {
        let Some(category) = self.get(category_id) else {
            return false;
        };
        category.user_name == username
            || self
                .parent_of(category)
                .is_some_and(|parent| parent.user_name == username)
    }

    /// Check that `parent_id` is a legal parent for the category `id`
    /// (`None` when the category is being created).
    ///
    /// # Errors
    ///
    /// Returns a [`HierarchyError`] describing the first broken rule.
    pub fn validate_parent(&self, id: Option<&str>, parent_id: Option<&str>) -> Result<(), HierarchyError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        if id == Some(parent_id) {
            return Err(HierarchyError::SelfParent);
        }
        let parent = self
            .get(parent_id)
            .ok_or_else(|| HierarchyError::UnknownParent(parent_id.to_owned()))?;
        if parent.deleted {
            return Err(HierarchyError::DeletedParent(parent_id.to_owned()));
        }
        if parent.parent_category_id.is_some() {
            return Err(HierarchyError::NestedParent(parent_id.to_owned()));
        }
        if let Some(own_id) = id {
            let has_children = self
                .live()
                .any(|c| c.parent_category_id.as_deref() == Some(own_id));
            if has_children {
                return Err(HierarchyError::HasChildren(own_id.to_owned()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn category(id: &str, name: &str, parent: Option<&str>, owner: &str) -> Category {
        Category {
            id: id.to_owned(),
            name: name.to_owned(),
            parent_category_id: parent.map(str::to_owned),
            primary_contact: format!("{name} Contact"),
            user_name: owner.to_owned(),
            primary_email: format!("{owner}@example.org"),
            phone: None,
            deleted: false,
        }
    }

    #[fixture]
    fn tree() -> CategoryTree {
        let mut retired = category("old", "Old", None, "nobody");
        retired.deleted = true;
        CategoryTree::new(vec![
            category("bld", "Buildings", None, "facilities"),
            category("hvac", "HVAC", Some("bld"), "hvac-tech"),
            category("it", "IT", None, "it-lead"),
            retired,
        ])
    }

    #[rstest]
    fn root_and_child_labels(tree: CategoryTree) {
        let bld = tree.get("bld").expect("bld");
        let hvac = tree.get("hvac").expect("hvac");
        assert_eq!(tree.display_name(bld), "Buildings - General");
        assert_eq!(tree.display_name(hvac), "Buildings - HVAC");
    }

    #[rstest]
    fn parent_owner_owns_children(tree: CategoryTree) {
        assert!(tree.is_owned_by("hvac", "facilities"));
        assert!(tree.is_owned_by("hvac", "hvac-tech"));
        assert!(!tree.is_owned_by("bld", "hvac-tech"));
        assert!(!tree.is_owned_by("missing", "facilities"));
    }

    #[rstest]
    #[case(None, Some("hvac"), Err(HierarchyError::NestedParent("hvac".into())))]
    #[case(Some("it"), Some("it"), Err(HierarchyError::SelfParent))]
    #[case(None, Some("old"), Err(HierarchyError::DeletedParent("old".into())))]
    #[case(None, Some("nope"), Err(HierarchyError::UnknownParent("nope".into())))]
    #[case(Some("bld"), Some("it"), Err(HierarchyError::HasChildren("bld".into())))]
    #[case(Some("it"), Some("bld"), Ok(()))]
    #[case(None, None, Ok(()))]
    fn parent_rules(
        tree: CategoryTree,
        #[case] id: Option<&str>,
        #[case] parent: Option<&str>,
        #[case] expected: Result<(), HierarchyError>,
    ) {
        assert_eq!(tree.validate_parent(id, parent), expected);
    }
}
