//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::Money;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_IMAGE_URL_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub description: String,
    pub image_url: String,
    pub category: ProductCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Books,
    HomeAndKitchen,
    Beauty,
    Sports,
    Toys,
    Grocery,
    #[default]
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Books => "Books",
            Self::HomeAndKitchen => "HomeAndKitchen",
            Self::Beauty => "Beauty",
            Self::Sports => "Sports",
            Self::Toys => "Toys",
            Self::Grocery => "Grocery",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ProductCategory {
    type Err = ProductError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electronics" => Ok(Self::Electronics),
            "Clothing" => Ok(Self::Clothing),
            "Books" => Ok(Self::Books),
            "HomeAndKitchen" => Ok(Self::HomeAndKitchen),
            "Beauty" => Ok(Self::Beauty),
            "Sports" => Ok(Self::Sports),
            "Toys" => Ok(Self::Toys),
            "Grocery" => Ok(Self::Grocery),
            "Other" => Ok(Self::Other),
            other => Err(ProductError::UnknownCategory(other.to_string())),
        }
    }
}

/// Catalog fields supplied by a client on create or update.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub price: Money,
    pub description: String,
    pub image_url: String,
    pub category: ProductCategory,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.name.chars().count() > MAX_NAME_LEN { return Err(ProductError::NameTooLong); }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN { return Err(ProductError::DescriptionTooLong); }
        if self.image_url.chars().count() > MAX_IMAGE_URL_LEN { return Err(ProductError::ImageUrlTooLong); }
        Ok(())
    }
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name: draft.name, price: draft.price, description: draft.description,
            image_url: draft.image_url, category: draft.category, created_at: now, updated_at: now,
        })
    }

    /// Replaces every catalog field. Existing order lines keep their captured price.
    pub fn apply(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        draft.validate()?;
        self.name = draft.name;
        self.price = draft.price;
        self.description = draft.description;
        self.image_url = draft.image_url;
        self.category = draft.category;
        self.touch();
        Ok(())
    }

    pub fn set_image(&mut self, locator: impl Into<String>) -> Result<(), ProductError> {
        let locator = locator.into();
        if locator.chars().count() > MAX_IMAGE_URL_LEN { return Err(ProductError::ImageUrlTooLong); }
        self.image_url = locator;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError { MissingName, NameTooLong, DescriptionTooLong, ImageUrlTooLong, UnknownCategory(String) }
impl std::error::Error for ProductError {}
impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::NameTooLong => write!(f, "Name exceeds {MAX_NAME_LEN} characters"),
            Self::DescriptionTooLong => write!(f, "Description exceeds {MAX_DESCRIPTION_LEN} characters"),
            Self::ImageUrlTooLong => write!(f, "Image locator exceeds {MAX_IMAGE_URL_LEN} characters"),
            Self::UnknownCategory(c) => write!(f, "Unknown category '{c}'"),
        }
    }
}

impl From<ProductError> for crate::EcommerceError {
    fn from(err: ProductError) -> Self { crate::EcommerceError::InvalidArgument(err.to_string()) }
}
