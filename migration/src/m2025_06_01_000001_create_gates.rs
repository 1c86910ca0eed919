//! Migration to create the gates table.
//!
//! A gate is an artist-owned landing page gating a file download behind
//! visitor actions. Requirement flags record which verifications a visitor
//! must complete before a download token may be issued.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db_backend = manager.get_database_backend();

        if db_backend == sea_orm::DatabaseBackend::Sqlite {
            // SQLite-compatible version using TEXT for UUID columns
            manager
                .create_table(
                    Table::create()
                        .table(Gates::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Gates::Id).text().not_null().primary_key())
                        .col(ColumnDef::new(Gates::OwnerId).text().not_null())
                        .col(ColumnDef::new(Gates::Slug).string().not_null())
                        .col(ColumnDef::new(Gates::Title).string().not_null())
                        .col(ColumnDef::new(Gates::FileUrl).string().not_null())
                        .col(
                            ColumnDef::new(Gates::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Gates::ExpiresAt).timestamp().null())
                        .col(ColumnDef::new(Gates::MaxDownloads).integer().null())
                        .col(
                            ColumnDef::new(Gates::RequireEmail)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireRepost)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireFollow)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireConnect)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireProfileClick)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Gates::TrackId).big_integer().null())
                        .col(ColumnDef::new(Gates::TargetUserId).big_integer().null())
                        .col(ColumnDef::new(Gates::BuyLinkUrl).string().null())
                        .col(ColumnDef::new(Gates::BuyLinkTitle).string().null())
                        .col(ColumnDef::new(Gates::PixelConfig).json().null())
                        .col(
                            ColumnDef::new(Gates::DownloadCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Gates::CreatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Gates::UpdatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        } else {
            // PostgreSQL version with proper UUID and timestamptz support
            manager
                .create_table(
                    Table::create()
                        .table(Gates::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Gates::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Gates::OwnerId).uuid().not_null())
                        .col(ColumnDef::new(Gates::Slug).string().not_null())
                        .col(ColumnDef::new(Gates::Title).string().not_null())
                        .col(ColumnDef::new(Gates::FileUrl).string().not_null())
                        .col(
                            ColumnDef::new(Gates::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Gates::ExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Gates::MaxDownloads).integer().null())
                        .col(
                            ColumnDef::new(Gates::RequireEmail)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireRepost)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireFollow)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireConnect)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gates::RequireProfileClick)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Gates::TrackId).big_integer().null())
                        .col(ColumnDef::new(Gates::TargetUserId).big_integer().null())
                        .col(ColumnDef::new(Gates::BuyLinkUrl).string().null())
                        .col(ColumnDef::new(Gates::BuyLinkTitle).string().null())
                        .col(ColumnDef::new(Gates::PixelConfig).json_binary().null())
                        .col(
                            ColumnDef::new(Gates::DownloadCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Gates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Gates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_gates_slug")
                    .table(Gates::Table)
                    .col(Gates::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Gates {
    Table,
    Id,
    OwnerId,
    Slug,
    Title,
    FileUrl,
    Active,
    ExpiresAt,
    MaxDownloads,
    RequireEmail,
    RequireRepost,
    RequireFollow,
    RequireConnect,
    RequireProfileClick,
    TrackId,
    TargetUserId,
    BuyLinkUrl,
    BuyLinkTitle,
    PixelConfig,
    DownloadCount,
    CreatedAt,
    UpdatedAt,
}
