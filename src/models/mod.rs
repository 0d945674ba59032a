//! Data models for the library server

pub mod book;
pub mod loan;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookFields, BookWithAvailability};
pub use loan::{BorrowRecord, BorrowRecordDetails, LoanStatus};
pub use session::Identity;
pub use user::{Role, User};
