//! Category and location administration.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{is_blank, is_email, is_phone, is_zip, new_id, non_blank, require_admin};
use crate::{
    access::Caller,
    category::{CategoryTree, HierarchyError},
    db::{
        DbPool,
        count_children,
        count_tickets_at_location,
        delete_location,
        get_category,
        get_location,
        insert_category,
        insert_location,
        list_categories,
        list_locations,
        soft_delete_category,
        update_category,
        update_location,
    },
    error::{HelpdeskError, ValidationErrors},
    models::{Category, CategoryChangeset, Location, LocationChangeset, NewCategory, NewLocation},
};

const DEFAULT_STATE: &str = "NY";

/// Category fields accepted from administrators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryForm {
    /// Short name.
    pub name: String,
    /// Parent category; must be a live root.
    #[serde(default)]
    pub parent_category_id: Option<String>,
    /// Contact display name.
    pub primary_contact: String,
    /// Directory username of the owner.
    pub user_name: String,
    /// Contact address.
    pub primary_email: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Location fields accepted from administrators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationForm {
    /// Site name.
    pub name: String,
    /// First address line.
    #[serde(default)]
    pub address1: Option<String>,
    /// Second address line.
    #[serde(default)]
    pub address2: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// State code; defaults to `NY`.
    #[serde(default)]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub zip: Option<String>,
    /// Contact display name.
    pub primary_contact: String,
    /// Contact address.
    pub primary_email: String,
    /// Contact phone.
    pub phone: String,
    /// Copy the contact on ticket notifications.
    #[serde(default)]
    pub send_email: bool,
}

/// Category with its rendered label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    /// Stored row.
    #[serde(flatten)]
    pub category: Category,
    /// `"{parent} - {name}"` or `"{name} - General"`.
    pub display_name: String,
}

/// Category and location operations. Reads are open to every caller,
/// writes to administrators only.
#[derive(Clone)]
pub struct CatalogService {
    pool: DbPool,
}

impl CatalogService {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: DbPool) -> Self { Self { pool } }

    /// Categories sorted by label; soft-deleted rows only on request.
    ///
    /// # Errors
    /// Returns database errors.
    pub async fn categories(&self, include_deleted: bool) -> Result<Vec<CategoryView>, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        let tree = CategoryTree::new(list_categories(&mut conn, true).await?);
        let mut views: Vec<CategoryView> = list_categories(&mut conn, include_deleted)
            .await?
            .into_iter()
            .map(|category| CategoryView {
                display_name: tree.display_name(&category),
                category,
            })
            .collect();
        views.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.category.id.cmp(&b.category.id))
        });
        Ok(views)
    }

    /// One category, deleted or not.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::NotFound`] for unknown ids.
    pub async fn category(&self, id: &str) -> Result<CategoryView, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        let category = get_category(&mut conn, id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("category", id))?;
        let parent = match category.parent_category_id.as_deref() {
            Some(parent_id) => get_category(&mut conn, parent_id).await?,
            None => None,
        };
        Ok(CategoryView {
            display_name: crate::category::display_name(&category, parent.as_ref()),
            category,
        })
    }

    /// Add a category.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Forbidden`] for non-administrators and
    /// [`HelpdeskError::Validation`] for bad fields or parents.
    pub async fn create_category(&self, form: &CategoryForm, caller: &Caller) -> Result<Category, HelpdeskError> {
        require_admin(caller, "manage categories")?;
        let mut conn = self.pool.get().await?;
        let tree = CategoryTree::new(list_categories(&mut conn, true).await?);
        validate_category(form, &tree, None)?;
        let id = new_id();
        let row = NewCategory {
            id: &id,
            name: form.name.trim(),
            parent_category_id: non_blank(form.parent_category_id.as_deref()),
            primary_contact: form.primary_contact.trim(),
            user_name: form.user_name.trim(),
            primary_email: form.primary_email.trim(),
            phone: non_blank(form.phone.as_deref()),
            deleted: false,
        };
        insert_category(&mut conn, &row).await?;
        info!(category = %id, name = row.name, user = %caller.username, "category created");
        get_category(&mut conn, &id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("category", &id))
    }

    /// Rewrite a category.
    ///
    /// # Errors
    /// As for [`Self::create_category`], plus [`HelpdeskError::NotFound`].
    pub async fn update_category(
        &self,
        id: &str,
        form: &CategoryForm,
        caller: &Caller,
    ) -> Result<Category, HelpdeskError> {
        require_admin(caller, "manage categories")?;
        let mut conn = self.pool.get().await?;
        let tree = CategoryTree::new(list_categories(&mut conn, true).await?);
        if tree.get(id).is_none() {
            return Err(HelpdeskError::not_found("category", id));
        }
        validate_category(form, &tree, Some(id))?;
        let changes = CategoryChangeset {
            name: form.name.trim(),
            parent_category_id: non_blank(form.parent_category_id.as_deref()),
            primary_contact: form.primary_contact.trim(),
            user_name: form.user_name.trim(),
            primary_email: form.primary_email.trim(),
            phone: non_blank(form.phone.as_deref()),
        };
        update_category(&mut conn, id, &changes).await?;
        info!(category = %id, user = %caller.username, "category updated");
        get_category(&mut conn, id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("category", id))
    }

    /// Soft-delete a category. Refused while live sub-categories remain.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Validation`] when the category still has
    /// children.
    pub async fn delete_category(&self, id: &str, caller: &Caller) -> Result<(), HelpdeskError> {
        require_admin(caller, "manage categories")?;
        let mut conn = self.pool.get().await?;
        if get_category(&mut conn, id).await?.is_none() {
            return Err(HelpdeskError::not_found("category", id));
        }
        if count_children(&mut conn, id).await? > 0 {
            return Err(HierarchyError::HasChildren(id.to_owned()).into());
        }
        soft_delete_category(&mut conn, id).await?;
        info!(category = %id, user = %caller.username, "category deleted");
        Ok(())
    }

    /// Locations sorted by name.
    ///
    /// # Errors
    /// Returns database errors.
    pub async fn locations(&self) -> Result<Vec<Location>, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        Ok(list_locations(&mut conn).await?)
    }

    /// One location.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::NotFound`] for unknown ids.
    pub async fn location(&self, id: &str) -> Result<Location, HelpdeskError> {
        let mut conn = self.pool.get().await?;
        get_location(&mut conn, id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("location", id))
    }

    /// Add a location.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Forbidden`] for non-administrators and
    /// [`HelpdeskError::Validation`] for bad fields.
    pub async fn create_location(&self, form: &LocationForm, caller: &Caller) -> Result<Location, HelpdeskError> {
        require_admin(caller, "manage locations")?;
        validate_location(form)?;
        let mut conn = self.pool.get().await?;
        let id = new_id();
        let row = NewLocation {
            id: &id,
            fields: location_changeset(form),
        };
        insert_location(&mut conn, &row).await?;
        info!(location = %id, name = row.fields.name, user = %caller.username, "location created");
        get_location(&mut conn, &id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("location", &id))
    }

    /// Rewrite a location.
    ///
    /// # Errors
    /// As for [`Self::create_location`], plus [`HelpdeskError::NotFound`].
    pub async fn update_location(
        &self,
        id: &str,
        form: &LocationForm,
        caller: &Caller,
    ) -> Result<Location, HelpdeskError> {
        require_admin(caller, "manage locations")?;
        validate_location(form)?;
        let mut conn = self.pool.get().await?;
        if update_location(&mut conn, id, &location_changeset(form)).await? == 0 {
            return Err(HelpdeskError::not_found("location", id));
        }
        info!(location = %id, user = %caller.username, "location updated");
        get_location(&mut conn, id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("location", id))
    }

    /// Remove a location no ticket refers to.
    ///
    /// # Errors
    /// Returns [`HelpdeskError::Validation`] while tickets still reference
    /// the location.
    pub async fn delete_location(&self, id: &str, caller: &Caller) -> Result<(), HelpdeskError> {
        require_admin(caller, "manage locations")?;
        let mut conn = self.pool.get().await?;
        let in_use = count_tickets_at_location(&mut conn, id).await?;
        if in_use > 0 {
            return Err(HelpdeskError::invalid(
                "id",
                format!("location is referenced by {in_use} ticket(s)"),
            ));
        }
        if delete_location(&mut conn, id).await? == 0 {
            return Err(HelpdeskError::not_found("location", id));
        }
        info!(location = %id, user = %caller.username, "location deleted");
        Ok(())
    }
}

fn validate_category(form: &CategoryForm, tree: &CategoryTree, id: Option<&str>) -> Result<(), HelpdeskError> {
    let mut errors = ValidationErrors::default();
    errors.check(!is_blank(&form.name), "name", "name is required");
    errors.check(!is_blank(&form.primary_contact), "primary_contact", "contact name is required");
    errors.check(!is_blank(&form.user_name), "user_name", "owner username is required");
    errors.check(is_email(&form.primary_email), "primary_email", "email is not a valid address");
    if let Some(phone) = non_blank(form.phone.as_deref()) {
        errors.check(is_phone(phone), "phone", "phone must look like 555-555-5555");
    }
    if let Err(err) = tree.validate_parent(id, non_blank(form.parent_category_id.as_deref())) {
        errors.push("parent_category_id", err.to_string());
    }
    errors.finish()
}

fn validate_location(form: &LocationForm) -> Result<(), HelpdeskError> {
    let mut errors = ValidationErrors::default();
    errors.check(!is_blank(&form.name), "name", "name is required");
    errors.check(!is_blank(&form.primary_contact), "primary_contact", "contact name is required");
    errors.check(is_email(&form.primary_email), "primary_email", "email is not a valid address");
    errors.check(is_phone(&form.phone), "phone", "phone must look like 555-555-5555");
    if let Some(zip) = non_blank(form.zip.as_deref()) {
        errors.check(is_zip(zip), "zip", "ZIP must be 12345 or 12345-6789");
    }
    if let Some(state) = non_blank(form.state.as_deref()) {
        errors.check(
            state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()),
            "state",
            "state must be a two-letter code",
        );
    }
    errors.finish()
}

fn location_changeset(form: &LocationForm) -> LocationChangeset<'_> {
    LocationChangeset {
        name: form.name.trim(),
        address1: non_blank(form.address1.as_deref()),
        address2: non_blank(form.address2.as_deref()),
        city: non_blank(form.city.as_deref()),
        state: non_blank(form.state.as_deref()).unwrap_or(DEFAULT_STATE),
        zip: non_blank(form.zip.as_deref()),
        primary_contact: form.primary_contact.trim(),
        primary_email: form.primary_email.trim(),
        phone: form.phone.trim(),
        send_email: form.send_email,
    }
}
