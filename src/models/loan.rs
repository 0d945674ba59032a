//! Borrow record (loan) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One loan of one copy of a book to one user.
///
/// Active while `return_date` is `None`; setting it is the single,
/// terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Values needed to append a record to the ledger
#[derive(Debug, Clone)]
pub struct NewBorrowRecord {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Derived loan state at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl BorrowRecord {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.due_date
    }

    /// Whole days left before the due date; 0 once returned or overdue
    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_active() || now > self.due_date {
            return 0;
        }
        (self.due_date - now).num_days()
    }

    /// Whole days past the due date, partial days never rounded up.
    /// Frozen at the return date once the book is back.
    pub fn overdue_days(&self, now: DateTime<Utc>) -> i64 {
        let end = self.return_date.unwrap_or(now);
        if end > self.due_date {
            (end - self.due_date).num_days()
        } else {
            0
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        if !self.is_active() {
            LoanStatus::Returned
        } else if self.is_overdue(now) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }
}

/// Loan with names resolved and derived values computed, for display and the JSON API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowRecordDetails {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub username: String,
    pub book_title: String,
    pub status: LoanStatus,
    pub is_overdue: bool,
    pub days_until_due: i64,
    pub overdue_days: i64,
}

impl BorrowRecordDetails {
    pub fn new(record: BorrowRecord, username: String, book_title: String, now: DateTime<Utc>) -> Self {
        Self {
            status: record.status(now),
            is_overdue: record.is_overdue(now),
            days_until_due: record.days_until_due(now),
            overdue_days: record.overdue_days(now),
            record,
            username,
            book_title,
        }
    }
}

/// Librarian borrow form
#[derive(Debug, Deserialize)]
pub struct BorrowForm {
    pub user_id: i32,
    pub book_id: i32,
    #[serde(default)]
    pub csrf_token: String,
}
