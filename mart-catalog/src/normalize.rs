//! Input normalization and validation.
//!
//! Every free-text field that takes part in lookup or grouping goes through
//! [`normalize_text`] exactly once, here, before anything is persisted.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mart_core::MartError;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::model::{parse_categories, Category, LocationKey};

/// Hard ceiling on images per listing; configuration can only lower it.
pub const MAX_AVATARS: usize = 3;

/// Trim and lowercase.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Editable listing fields as submitted by a seller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListingFields {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "is required"))]
    pub price: String,

    #[validate(length(min = 1, message = "is required"))]
    pub description: String,

    #[validate(length(min = 1, message = "is required"))]
    pub contact: String,

    #[validate(length(min = 1, message = "is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "is required"))]
    pub category: String,
}

impl ListingFields {
    /// Lowercase the text fields, trim the numeric ones.
    pub fn normalized(self) -> Self {
        Self {
            name: normalize_text(&self.name),
            price: self.price.trim().to_string(),
            description: normalize_text(&self.description),
            contact: self.contact.trim().to_string(),
            address: normalize_text(&self.address),
            category: normalize_text(&self.category),
        }
    }
}

/// Location fields as submitted by a seller.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LocationFields {
    #[validate(length(min = 1, message = "is required"))]
    pub institution: String,

    #[validate(length(min = 1, message = "is required"))]
    pub city: String,
}

/// Registration request: a seller listing under a campus/city pairing.
#[derive(Debug, Clone, Default)]
pub struct RegisterListing {
    pub location: LocationFields,
    pub listing: ListingFields,
    pub avatars: Vec<PathBuf>,
}

/// Update request: replacement fields plus a fresh avatar set.
#[derive(Debug, Clone, Default)]
pub struct UpdateListing {
    pub listing: ListingFields,
    pub avatars: Vec<PathBuf>,
}

/// Listing fields after validation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetails {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub categories: Vec<Category>,
    pub address: String,
    pub contact: u64,
}

#[derive(Default)]
struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    fn push(&mut self, field: &str, msg: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(msg.into());
    }

    fn absorb(&mut self, errs: &validator::ValidationErrors) {
        for (field, kind) in errs.errors() {
            if let validator::ValidationErrorsKind::Field(field_errors) = kind {
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    self.push(field, msg);
                }
            }
        }
    }

    fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result(self) -> Result<(), MartError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(MartError::validation("Missing or invalid fields").with_errors(json!(self.0)))
    }
}

fn parse_price(raw: &str) -> Result<f64, &'static str> {
    let price: f64 = raw.parse().map_err(|_| "must be a number")?;
    if !price.is_finite() || price < 0.0 {
        return Err("must be a non-negative number");
    }
    Ok(price)
}

fn check_avatar_count(errors: &mut FieldErrors, avatars: &[PathBuf], max_avatars: usize) {
    let max_avatars = max_avatars.clamp(1, MAX_AVATARS);
    if avatars.is_empty() {
        errors.push("avatar", "at least one image is required");
    } else if avatars.len() > max_avatars {
        errors.push("avatar", format!("at most {max_avatars} images are allowed"));
    }
}

fn validate_listing(errors: &mut FieldErrors, fields: &ListingFields) -> Option<ListingDetails> {
    if let Err(e) = fields.validate() {
        errors.absorb(&e);
    }

    let price = if errors.has("price") {
        None
    } else {
        parse_price(&fields.price)
            .map_err(|msg| errors.push("price", msg))
            .ok()
    };

    let contact = if errors.has("contact") {
        None
    } else {
        fields
            .contact
            .parse::<u64>()
            .map_err(|_| errors.push("contact", "must be a numeric contact number"))
            .ok()
    };

    let categories = if errors.has("category") {
        None
    } else {
        parse_categories(&fields.category)
            .map_err(|msg| errors.push("category", msg))
            .ok()
    };

    Some(ListingDetails {
        name: fields.name.clone(),
        price: price?,
        description: fields.description.clone(),
        categories: categories?,
        address: fields.address.clone(),
        contact: contact?,
    })
}

impl RegisterListing {
    /// Normalize and validate. Nothing has side effects before this passes.
    pub fn validate(self, max_avatars: usize) -> Result<(LocationKey, ListingDetails, Vec<PathBuf>), MartError> {
        let location = LocationFields {
            institution: normalize_text(&self.location.institution),
            city: normalize_text(&self.location.city),
        };
        let listing = self.listing.normalized();

        let mut errors = FieldErrors::default();
        if let Err(e) = location.validate() {
            errors.absorb(&e);
        }
        let details = validate_listing(&mut errors, &listing);
        check_avatar_count(&mut errors, &self.avatars, max_avatars);
        errors.into_result()?;

        let details = details.ok_or_else(|| MartError::validation("Missing or invalid fields"))?;
        let key = LocationKey {
            institution: location.institution,
            city: location.city,
        };
        Ok((key, details, self.avatars))
    }
}

impl UpdateListing {
    /// Normalize and validate the replacement fields and avatar set.
    pub fn validate(self, max_avatars: usize) -> Result<(ListingDetails, Vec<PathBuf>), MartError> {
        let listing = self.listing.normalized();

        let mut errors = FieldErrors::default();
        let details = validate_listing(&mut errors, &listing);
        check_avatar_count(&mut errors, &self.avatars, max_avatars);
        errors.into_result()?;

        let details = details.ok_or_else(|| MartError::validation("Missing or invalid fields"))?;
        Ok((details, self.avatars))
    }
}
