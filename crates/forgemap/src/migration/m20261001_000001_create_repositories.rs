//! Initial migration creating the `repositories` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    // Identity
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repositories::Provider).string().not_null())
                    .col(
                        ColumnDef::new(Repositories::ProviderRepoId)
                            .string()
                            .not_null(),
                    )
                    // Path
                    .col(ColumnDef::new(Repositories::FullName).text().not_null())
                    .col(ColumnDef::new(Repositories::GroupPath).text().not_null())
                    // Content
                    .col(
                        ColumnDef::new(Repositories::Languages)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(
                        ColumnDef::new(Repositories::Visibility)
                            .string()
                            .not_null()
                            .default("private"),
                    )
                    .col(
                        ColumnDef::new(Repositories::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // Timestamps
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastPushAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastSyncAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert conflict target
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_provider_repo_id")
                    .table(Repositories::Table)
                    .col(Repositories::Provider)
                    .col(Repositories::ProviderRepoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Subtree queries
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_group_path")
                    .table(Repositories::Table)
                    .col(Repositories::GroupPath)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_provider")
                    .table(Repositories::Table)
                    .col(Repositories::Provider)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Provider,
    ProviderRepoId,
    FullName,
    GroupPath,
    Languages,
    Visibility,
    IsArchived,
    CreatedAt,
    LastPushAt,
    LastSyncAt,
}
