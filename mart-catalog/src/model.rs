//! Catalog documents: location entries and the seller listings they embed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mart_core::OwnerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(EntryId);
uuid_id!(ListingId);

/// Product categories a listing can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    #[serde(alias = "pg")]
    Lodging,
    Book,
    #[serde(alias = "dress")]
    Apparel,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Food,
        Category::Lodging,
        Category::Book,
        Category::Apparel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Lodging => "lodging",
            Category::Book => "book",
            Category::Apparel => "apparel",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Category::Food),
            "lodging" | "pg" => Ok(Category::Lodging),
            "book" => Ok(Category::Book),
            "apparel" | "dress" => Ok(Category::Apparel),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Parse a comma-separated category list.
///
/// The result is non-empty, free of duplicates and keeps first-seen order.
pub fn parse_categories(raw: &str) -> Result<Vec<Category>, String> {
    let mut out: Vec<Category> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let category: Category = part.parse()?;
        if !out.contains(&category) {
            out.push(category);
        }
    }

    if out.is_empty() {
        return Err("at least one category is required".to_string());
    }
    Ok(out)
}

/// Natural key of a location entry. Both parts are normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey {
    pub institution: String,
    pub city: String,
}

impl LocationKey {
    /// Build a key, normalizing both parts.
    pub fn new(institution: &str, city: &str) -> Self {
        Self {
            institution: crate::normalize::normalize_text(institution),
            city: crate::normalize::normalize_text(city),
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.institution, self.city)
    }
}

/// One seller's offering, embedded in a [`LocationEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerListing {
    pub id: ListingId,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub categories: Vec<Category>,
    pub address: String,
    pub contact: u64,
    pub avatars: Vec<String>,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The per-(institution, city) document aggregating seller listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
    pub id: EntryId,
    pub institution: String,
    pub city: String,
    pub listings: Vec<SellerListing>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationEntry {
    /// A fresh entry holding exactly one listing.
    pub fn with_listing(key: LocationKey, listing: SellerListing) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId::new(),
            institution: key.institution,
            city: key.city,
            listings: vec![listing],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> LocationKey {
        LocationKey {
            institution: self.institution.clone(),
            city: self.city.clone(),
        }
    }

    pub fn listing(&self, id: &ListingId) -> Option<&SellerListing> {
        self.listings.iter().find(|l| &l.id == id)
    }

    pub fn listing_mut(&mut self, id: &ListingId) -> Option<&mut SellerListing> {
        self.listings.iter_mut().find(|l| &l.id == id)
    }

    /// Every media URL referenced by this entry, in listing order.
    pub fn avatar_urls(&self) -> Vec<String> {
        self.listings
            .iter()
            .flat_map(|l| l.avatars.iter().cloned())
            .collect()
    }
}
