pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_draw_tables;
mod m20250901_000002_create_recommendation_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_draw_tables::Migration),
            Box::new(m20250901_000002_create_recommendation_tables::Migration),
        ]
    }
}
