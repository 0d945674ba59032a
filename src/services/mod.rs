//! Business logic services

pub mod catalog;
pub mod loans;
pub mod seed;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use chrono::Duration;

use crate::{clock::Clock, config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub sessions: sessions::SessionStore,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), clock.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            loans: loans::LoansService::new(repository, clock.clone(), config.loans.loan_period_days),
            sessions: sessions::SessionStore::new(Duration::hours(config.session.ttl_hours), clock),
        }
    }
}
