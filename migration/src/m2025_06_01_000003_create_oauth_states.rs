//! Migration to create the oauth_states table.
//!
//! One row per pending authorization round-trip. The `used` flag is flipped
//! by a conditional update so two concurrent callbacks carrying the same
//! state token can never both succeed.

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
                        .table(OAuthStates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OAuthStates::Id)
                                .text()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OAuthStates::State).string().not_null())
                        .col(ColumnDef::new(OAuthStates::Provider).string().not_null())
                        .col(ColumnDef::new(OAuthStates::SubmissionId).text().not_null())
                        .col(ColumnDef::new(OAuthStates::GateId).text().not_null())
                        .col(ColumnDef::new(OAuthStates::CodeVerifier).string().null())
                        .col(ColumnDef::new(OAuthStates::CommentText).string().null())
                        .col(
                            ColumnDef::new(OAuthStates::Used)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::ExpiresAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::CreatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::UpdatedAt)
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
                        .table(OAuthStates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OAuthStates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OAuthStates::State).string().not_null())
                        .col(ColumnDef::new(OAuthStates::Provider).string().not_null())
                        .col(ColumnDef::new(OAuthStates::SubmissionId).uuid().not_null())
                        .col(ColumnDef::new(OAuthStates::GateId).uuid().not_null())
                        .col(ColumnDef::new(OAuthStates::CodeVerifier).string().null())
                        .col(ColumnDef::new(OAuthStates::CommentText).string().null())
                        .col(
                            ColumnDef::new(OAuthStates::Used)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(OAuthStates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        // State tokens are globally unique CSRF nonces.
        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_states_state")
                    .table(OAuthStates::Table)
                    .col(OAuthStates::State)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Expiry index for the cleanup sweep.
        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_states_expires_at")
                    .table(OAuthStates::Table)
                    .col(OAuthStates::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OAuthStates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OAuthStates {
    #[sea_orm(iden = "oauth_states")]
    Table,
    Id,
    State,
    Provider,
    SubmissionId,
    GateId,
    CodeVerifier,
    CommentText,
    Used,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
