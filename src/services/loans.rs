//! Loan management service

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::loan::{BorrowRecord, BorrowRecordDetails, NewBorrowRecord},
    repository::Repository,
};

const UNKNOWN_USER: &str = "Unknown user";
const UNKNOWN_BOOK: &str = "Unknown book";

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    loan_period: Duration,
}

impl LoansService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, loan_period_days: i64) -> Self {
        Self {
            repository,
            clock,
            loan_period: Duration::days(loan_period_days),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lend a book from now until the end of the loan period
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRecord> {
        let now = self.clock.now();
        self.create(user_id, book_id, now, now + self.loan_period).await
    }

    /// Create a loan.
    ///
    /// The user and the book must exist, a copy must be on the shelf, and the
    /// user must not already hold an active loan of the same book. Every check
    /// and the insert happen under the loans write guard, so concurrent
    /// requests cannot both take the last copy.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        if due_date <= borrow_date {
            return Err(AppError::Validation(
                "Due date must be after the borrow date".to_string(),
            ));
        }

        let users = self.repository.users.read().await;
        let user = users.get(user_id)?;
        let books = self.repository.books.read().await;
        let book = books.get(book_id)?;
        let mut loans = self.repository.loans.write().await;

        let available = book.quantity - loans.active_count_for_book(book_id) as i32;
        if available <= 0 {
            tracing::debug!("Loan refused: book {} has no copy left", book_id);
            return Err(AppError::Conflict("No available stock for this book".to_string()));
        }
        if loans.has_active(user_id, book_id) {
            tracing::debug!("Loan refused: user {} already holds book {}", user_id, book_id);
            return Err(AppError::Conflict(
                "You have already borrowed this book and not returned it".to_string(),
            ));
        }

        let record = loans.insert(
            NewBorrowRecord {
                user_id,
                book_id,
                borrow_date,
                due_date,
                return_date: None,
            },
            self.clock.now(),
        );
        tracing::info!(
            "Loan {} created: {} borrowed \"{}\" until {}",
            record.id,
            user.username,
            book.title,
            record.due_date.format("%Y-%m-%d")
        );
        Ok(record)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, id: i32) -> AppResult<BorrowRecord> {
        let record = self
            .repository
            .loans
            .write()
            .await
            .mark_returned(id, self.clock.now())?;
        tracing::info!("Loan {} returned", record.id);
        Ok(record)
    }

    pub async fn get(&self, id: i32) -> AppResult<BorrowRecord> {
        self.repository.loans.read().await.get(id).cloned()
    }

    pub async fn all(&self) -> Vec<BorrowRecord> {
        self.repository.loans.read().await.all().to_vec()
    }

    pub async fn by_user(&self, user_id: i32) -> Vec<BorrowRecord> {
        self.repository.loans.read().await.by_user(user_id).cloned().collect()
    }

    pub async fn by_book(&self, book_id: i32) -> Vec<BorrowRecord> {
        self.repository.loans.read().await.by_book(book_id).cloned().collect()
    }

    pub async fn active(&self) -> Vec<BorrowRecord> {
        self.repository.loans.read().await.active().cloned().collect()
    }

    /// Active loans past their due date at this instant
    pub async fn overdue(&self) -> Vec<BorrowRecord> {
        let now = self.clock.now();
        self.repository.loans.read().await.overdue(now).cloned().collect()
    }

    /// Resolve names and compute the derived values of each record
    pub async fn details(&self, records: Vec<BorrowRecord>) -> Vec<BorrowRecordDetails> {
        let now = self.clock.now();
        let users = self.repository.users.read().await;
        let books = self.repository.books.read().await;
        records
            .into_iter()
            .map(|record| {
                let username = users
                    .get(record.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|_| UNKNOWN_USER.to_string());
                let book_title = books
                    .get(record.book_id)
                    .map(|b| b.title.clone())
                    .unwrap_or_else(|_| UNKNOWN_BOOK.to_string());
                BorrowRecordDetails::new(record, username, book_title, now)
            })
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.repository.loans.read().await.all().len()
    }

    pub async fn count_active(&self) -> usize {
        self.repository.loans.read().await.active().count()
    }

    pub async fn count_overdue(&self) -> usize {
        let now = self.clock.now();
        self.repository.loans.read().await.overdue(now).count()
    }

    /// Active and overdue counts for one user
    pub async fn counts_for_user(&self, user_id: i32) -> (usize, usize) {
        let now = self.clock.now();
        let loans = self.repository.loans.read().await;
        loans
            .by_user(user_id)
            .filter(|r| r.is_active())
            .fold((0, 0), |(active, overdue), r| {
                (active + 1, overdue + usize::from(r.is_overdue(now)))
            })
    }

    /// Ids of the books a user currently holds
    pub async fn active_book_ids(&self, user_id: i32) -> Vec<i32> {
        self.repository
            .loans
            .read()
            .await
            .by_user(user_id)
            .filter(|r| r.is_active())
            .map(|r| r.book_id)
            .collect()
    }
}
