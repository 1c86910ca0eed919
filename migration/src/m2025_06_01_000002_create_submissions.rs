//! Migration to create the submissions table.
//!
//! A submission is one visitor's attempt to satisfy a gate's requirements.
//! Verification flags are monotonic (false to true only) and each carries the
//! timestamp of its first transition. The download token columns hold the
//! currently issued credential; `download_completed` is the terminal one-time
//! redemption flag.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db_backend = manager.get_database_backend();

        if db_backend == sea_orm::DatabaseBackend::Sqlite {
            manager
                .create_table(
                    Table::create()
                        .table(Submissions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Submissions::Id)
                                .text()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Submissions::GateId).text().not_null())
                        .col(ColumnDef::new(Submissions::Email).string().not_null())
                        .col(
                            ColumnDef::new(Submissions::EmailVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::EmailVerifiedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::RepostVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::RepostVerifiedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::FollowVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::FollowVerifiedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::ConnectVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::ConnectVerifiedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::ProfileClicked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::ProfileClickedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(ColumnDef::new(Submissions::CommentText).string().null())
                        .col(ColumnDef::new(Submissions::DownloadToken).string().null())
                        .col(
                            ColumnDef::new(Submissions::DownloadTokenExpiresAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::DownloadCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::DownloadCompletedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(ColumnDef::new(Submissions::IpAddress).string().null())
                        .col(ColumnDef::new(Submissions::UserAgent).string().null())
                        .col(
                            ColumnDef::new(Submissions::CreatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Submissions::UpdatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        } else {
            manager
                .create_table(
                    Table::create()
                        .table(Submissions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Submissions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Submissions::GateId).uuid().not_null())
                        .col(ColumnDef::new(Submissions::Email).string().not_null())
                        .col(
                            ColumnDef::new(Submissions::EmailVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::EmailVerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::RepostVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::RepostVerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::FollowVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::FollowVerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::ConnectVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::ConnectVerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::ProfileClicked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::ProfileClickedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Submissions::CommentText).string().null())
                        .col(ColumnDef::new(Submissions::DownloadToken).string().null())
                        .col(
                            ColumnDef::new(Submissions::DownloadTokenExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Submissions::DownloadCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Submissions::DownloadCompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Submissions::IpAddress).string().null())
                        .col(ColumnDef::new(Submissions::UserAgent).string().null())
                        .col(
                            ColumnDef::new(Submissions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Submissions::UpdatedAt)
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
                    .name("idx_submissions_gate_id")
                    .table(Submissions::Table)
                    .col(Submissions::GateId)
                    .to_owned(),
            )
            .await?;

        // Download token lookup happens on the redemption hot path.
        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_download_token")
                    .table(Submissions::Table)
                    .col(Submissions::DownloadToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Submissions {
    Table,
    Id,
    GateId,
    Email,
    EmailVerified,
    EmailVerifiedAt,
    RepostVerified,
    RepostVerifiedAt,
    FollowVerified,
    FollowVerifiedAt,
    ConnectVerified,
    ConnectVerifiedAt,
    ProfileClicked,
    ProfileClickedAt,
    CommentText,
    DownloadToken,
    DownloadTokenExpiresAt,
    DownloadCompleted,
    DownloadCompletedAt,
    IpAddress,
    UserAgent,
    CreatedAt,
    UpdatedAt,
}
