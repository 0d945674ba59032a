//! Repository layer: one owned, lock-guarded collection per entity.
//!
//! Each collection sits behind a single `RwLock`; check-then-act sequences
//! run under the write guard. When a sequence spans several collections the
//! guards are always taken in the order users → books → loans.

pub mod books;
pub mod loans;
pub mod users;

/// Main repository struct holding every collection
#[derive(Clone, Default)]
pub struct Repository {
    pub users: users::UsersRepository,
    pub books: books::BooksRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a repository with empty collections
    pub fn new() -> Self {
        Self::default()
    }
}
