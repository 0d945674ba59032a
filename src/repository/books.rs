//! Books repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFields},
};

#[derive(Clone, Default)]
pub struct BooksRepository {
    table: Arc<RwLock<BookTable>>,
}

impl BooksRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, BookTable> {
        self.table.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, BookTable> {
        self.table.write().await
    }
}

/// Books keyed by id, iterated in insertion order
#[derive(Debug)]
pub struct BookTable {
    rows: IndexMap<i32, Book>,
    next_id: i32,
}

impl Default for BookTable {
    fn default() -> Self {
        Self {
            rows: IndexMap::new(),
            next_id: 1,
        }
    }
}

impl BookTable {
    pub fn get(&self, id: i32) -> AppResult<&Book> {
        self.rows
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub fn list(&self) -> impl Iterator<Item = &Book> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether another book already carries this ISBN
    pub fn isbn_taken(&self, isbn: &str, excluding: Option<i32>) -> bool {
        self.rows
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != excluding)
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<String> {
        self.rows
            .values()
            .map(|b| b.category.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn insert(&mut self, fields: BookFields, created_at: DateTime<Utc>) -> Book {
        let book = Book {
            id: self.next_id,
            title: fields.title,
            author: fields.author,
            isbn: fields.isbn,
            published_year: fields.published_year,
            category: fields.category,
            description: fields.description,
            cover_url: fields.cover_url,
            quantity: fields.quantity,
            created_at,
        };
        self.next_id += 1;
        self.rows.insert(book.id, book.clone());
        book
    }

    pub fn update(&mut self, id: i32, fields: BookFields) -> AppResult<Book> {
        let book = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        book.title = fields.title;
        book.author = fields.author;
        book.isbn = fields.isbn;
        book.published_year = fields.published_year;
        book.category = fields.category;
        book.description = fields.description;
        book.cover_url = fields.cover_url;
        book.quantity = fields.quantity;
        Ok(book.clone())
    }

    /// Remove a book, keeping the insertion order of the others
    pub fn remove(&mut self, id: i32) -> AppResult<Book> {
        self.rows
            .shift_remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }
}
