use sea_orm_migration::prelude::*;

mod m20241020_create_search_cache;
mod m20241104_search_cache_expiry_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241020_create_search_cache::Migration),
            Box::new(m20241104_search_cache_expiry_index::Migration),
        ]
    }
}
