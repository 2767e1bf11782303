//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations for each entity. They borrow a
//! `DatabaseConnection`, stamp timestamps from the server clock and report
//! failures as [`RepositoryError`](crate::error::RepositoryError).

pub mod backup_routine;
pub mod backup_tool;
pub mod client;
pub mod user;
pub mod validation;

pub use backup_routine::BackupRoutineRepository;
pub use backup_tool::BackupToolRepository;
pub use client::ClientRepository;
pub use user::UserRepository;
pub use validation::{ValidationRecord, ValidationRepository};

use sea_orm::sea_query::LikeExpr;

/// Case-insensitive "contains" pattern for a user search term. LIKE
/// wildcards in the term match literally.
pub(crate) fn contains_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(escape_like(term)).escape('\\')
}

fn escape_like(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
