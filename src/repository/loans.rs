//! Loans (borrow records) repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    error::{AppError, AppResult},
    models::loan::{BorrowRecord, NewBorrowRecord},
};

#[derive(Clone, Default)]
pub struct LoansRepository {
    table: Arc<RwLock<LoanTable>>,
}

impl LoansRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, LoanTable> {
        self.table.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, LoanTable> {
        self.table.write().await
    }
}

/// Append-only ledger; records are never deleted
#[derive(Debug)]
pub struct LoanTable {
    rows: Vec<BorrowRecord>,
    next_id: i32,
}

impl Default for LoanTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl LoanTable {
    pub fn get(&self, id: i32) -> AppResult<&BorrowRecord> {
        self.rows
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    pub fn all(&self) -> &[BorrowRecord] {
        &self.rows
    }

    pub fn by_user(&self, user_id: i32) -> impl Iterator<Item = &BorrowRecord> {
        self.rows.iter().filter(move |r| r.user_id == user_id)
    }

    pub fn by_book(&self, book_id: i32) -> impl Iterator<Item = &BorrowRecord> {
        self.rows.iter().filter(move |r| r.book_id == book_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &BorrowRecord> {
        self.rows.iter().filter(|r| r.is_active())
    }

    pub fn overdue(&self, now: DateTime<Utc>) -> impl Iterator<Item = &BorrowRecord> {
        self.rows.iter().filter(move |r| r.is_overdue(now))
    }

    pub fn active_count_for_book(&self, book_id: i32) -> usize {
        self.by_book(book_id).filter(|r| r.is_active()).count()
    }

    pub fn has_active(&self, user_id: i32, book_id: i32) -> bool {
        self.by_user(user_id)
            .any(|r| r.book_id == book_id && r.is_active())
    }

    pub fn insert(&mut self, new: NewBorrowRecord, created_at: DateTime<Utc>) -> BorrowRecord {
        let record = BorrowRecord {
            id: self.next_id,
            user_id: new.user_id,
            book_id: new.book_id,
            borrow_date: new.borrow_date,
            due_date: new.due_date,
            return_date: new.return_date,
            created_at,
        };
        self.next_id += 1;
        self.rows.push(record.clone());
        record
    }

    /// Active → Returned. Fails on an unknown id or an already returned record.
    pub fn mark_returned(&mut self, id: i32, returned_at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let record = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))?;

        if record.return_date.is_some() {
            return Err(AppError::Conflict("This book has already been returned".to_string()));
        }

        record.return_date = Some(returned_at);
        Ok(record.clone())
    }
}
