use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_tables;
mod m20250601_000002_create_search_cache;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_tables::Migration),
            Box::new(m20250601_000002_create_search_cache::Migration),
        ]
    }
}
