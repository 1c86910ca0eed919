//! Database migrations for the Fangate service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_gates;
mod m2025_06_01_000002_create_submissions;
mod m2025_06_01_000003_create_oauth_states;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_gates::Migration),
            Box::new(m2025_06_01_000002_create_submissions::Migration),
            Box::new(m2025_06_01_000003_create_oauth_states::Migration),
        ]
    }
}
