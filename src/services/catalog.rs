//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::book::{Book, BookFields, BookQuery, BookWithAvailability},
    repository::{books::BookTable, loans::LoanTable, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

fn availability_of(book: &Book, loans: &LoanTable) -> BookWithAvailability {
    let available = (book.quantity - loans.active_count_for_book(book.id) as i32).max(0);
    BookWithAvailability {
        book: book.clone(),
        available,
        is_available: available > 0,
    }
}

fn ensure_isbn_free(books: &BookTable, isbn: &str, excluding: Option<i32>) -> AppResult<()> {
    if books.isbn_taken(isbn, excluding) {
        return Err(AppError::Conflict(format!(
            "A book with ISBN {} already exists",
            isbn
        )));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Add a book after validating its fields and ISBN uniqueness
    pub async fn create(&self, fields: BookFields) -> AppResult<Book> {
        let fields = fields.trimmed();
        fields.validate()?;

        let mut books = self.repository.books.write().await;
        ensure_isbn_free(&books, &fields.isbn, None)?;
        let book = books.insert(fields, self.clock.now());
        tracing::info!("Created book {} (id={})", book.title, book.id);
        Ok(book)
    }

    /// Get book by ID
    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.books.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Book> {
        self.repository.books.read().await.list().cloned().collect()
    }

    pub async fn list_by_category(&self, category: &str) -> Vec<Book> {
        self.repository
            .books
            .read()
            .await
            .list()
            .filter(|b| b.category == category)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search, in storage order
    pub async fn search(&self, query: &str) -> Vec<Book> {
        let needle = query.trim().to_lowercase();
        self.repository
            .books
            .read()
            .await
            .list()
            .filter(|b| b.matches(&needle))
            .cloned()
            .collect()
    }

    /// Search when `q` is set, else filter by category, else everything
    pub async fn query(&self, query: &BookQuery) -> Vec<Book> {
        let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let category = query.category.as_deref().filter(|c| !c.is_empty());
        match (q, category) {
            (Some(q), _) => self.search(q).await,
            (None, Some(category)) => self.list_by_category(category).await,
            (None, None) => self.list().await,
        }
    }

    /// Replace a book's fields. Its own ISBN does not count as a duplicate.
    pub async fn update(&self, id: i32, fields: BookFields) -> AppResult<Book> {
        let fields = fields.trimmed();
        fields.validate()?;

        let mut books = self.repository.books.write().await;
        books.get(id)?;
        ensure_isbn_free(&books, &fields.isbn, Some(id))?;
        let book = books.update(id, fields)?;
        tracing::info!("Updated book {} (id={})", book.title, book.id);
        Ok(book)
    }

    /// Delete a book that no active loan references
    pub async fn delete(&self, id: i32) -> AppResult<Book> {
        let mut books = self.repository.books.write().await;
        books.get(id)?;

        let loans = self.repository.loans.read().await;
        if loans.active_count_for_book(id) > 0 {
            return Err(AppError::Conflict(
                "Cannot delete a book that is currently borrowed".to_string(),
            ));
        }

        let book = books.remove(id)?;
        tracing::info!("Deleted book {} (id={})", book.title, book.id);
        Ok(book)
    }

    /// Quantity minus active loans, read under both guards
    pub async fn availability(&self, id: i32) -> AppResult<i32> {
        let books = self.repository.books.read().await;
        let loans = self.repository.loans.read().await;
        Ok(availability_of(books.get(id)?, &loans).available)
    }

    pub async fn get_with_availability(&self, id: i32) -> AppResult<BookWithAvailability> {
        let books = self.repository.books.read().await;
        let loans = self.repository.loans.read().await;
        Ok(availability_of(books.get(id)?, &loans))
    }

    /// Attach availability to a list of books from one consistent snapshot
    pub async fn with_availability(&self, books: Vec<Book>) -> Vec<BookWithAvailability> {
        let loans = self.repository.loans.read().await;
        books
            .iter()
            .map(|book| availability_of(book, &loans))
            .collect()
    }

    /// Every book with at least one copy on the shelf
    pub async fn available_books(&self) -> Vec<BookWithAvailability> {
        let books = self.repository.books.read().await;
        let loans = self.repository.loans.read().await;
        books
            .list()
            .map(|book| availability_of(book, &loans))
            .filter(|b| b.is_available)
            .collect()
    }

    /// Distinct categories in first-seen order
    pub async fn categories(&self) -> Vec<String> {
        self.repository.books.read().await.categories()
    }

    pub async fn count(&self) -> usize {
        self.repository.books.read().await.len()
    }
}
