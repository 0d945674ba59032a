//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Stored book
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub category: String,
    pub description: String,
    pub cover_url: String,
    /// Copies owned by the library, at least 1
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a book, shared by create and update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookFields {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    #[validate(range(min = 1000, max = 2100, message = "Published year must be between 1000 and 2100"))]
    pub published_year: i32,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Cover URL is required"))]
    pub cover_url: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

impl BookFields {
    /// Strip surrounding whitespace so blank input fails the non-empty checks
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            category: self.category.trim().to_string(),
            description: self.description.trim().to_string(),
            cover_url: self.cover_url.trim().to_string(),
            ..self
        }
    }
}

/// Admin add/edit form (urlencoded bodies cannot go through `serde(flatten)`
/// because numbers would arrive as strings)
#[derive(Debug, Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
    pub category: String,
    pub description: String,
    pub cover_url: String,
    pub quantity: i32,
    #[serde(default)]
    pub csrf_token: String,
}

impl BookForm {
    pub fn into_parts(self) -> (BookFields, String) {
        let fields = BookFields {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            published_year: self.published_year,
            category: self.category,
            description: self.description,
            cover_url: self.cover_url,
            quantity: self.quantity,
        };
        (fields, self.csrf_token)
    }
}

/// Book with its live availability
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookWithAvailability {
    #[serde(flatten)]
    pub book: Book,
    /// quantity minus active loans
    pub available: i32,
    pub is_available: bool,
}

/// Catalog list filters. `q` wins over `category` when both are set.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Case-insensitive match over title, author, ISBN and description
    pub q: Option<String>,
    pub category: Option<String>,
}

impl Book {
    /// Case-insensitive substring match over title, author, isbn and description.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.author, &self.isbn, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}
