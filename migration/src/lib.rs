pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_resource_tables;
mod m20260901_000002_create_package_tables;
mod m20260901_000003_create_order_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_resource_tables::Migration),
            Box::new(m20260901_000002_create_package_tables::Migration),
            Box::new(m20260901_000003_create_order_tables::Migration),
        ]
    }
}
