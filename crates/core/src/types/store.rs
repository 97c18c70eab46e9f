//! Store (tenant) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::StoreId;

/// Which identity field of a [`Store`] an identifier matched.
///
/// Ordered by resolution precedence: a custom domain match always beats a
/// subdomain match, which beats a slug match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    CustomDomain,
    Subdomain,
    Slug,
}

/// A tenant storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    /// Path identifier used on the bare platform domain (`/acme`).
    pub slug: String,
    /// Leftmost label under the platform domain (`acme.<platform>`).
    pub subdomain: Option<String>,
    /// Fully qualified domain owned by the merchant.
    pub custom_domain: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// The highest-precedence field equal to `identifier`, compared
    /// case-insensitively.
    #[must_use]
    pub fn matched_field(&self, identifier: &str) -> Option<IdentityField> {
        let eq = |field: Option<&str>| field.is_some_and(|v| v.eq_ignore_ascii_case(identifier));

        if eq(self.custom_domain.as_deref()) {
            Some(IdentityField::CustomDomain)
        } else if eq(self.subdomain.as_deref()) {
            Some(IdentityField::Subdomain)
        } else if eq(Some(&self.slug)) {
            Some(IdentityField::Slug)
        } else {
            None
        }
    }

    /// All identifiers this store can be reached by, lower-cased.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        [
            self.custom_domain.as_deref(),
            self.subdomain.as_deref(),
            Some(self.slug.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::to_ascii_lowercase)
        .collect()
    }
}
