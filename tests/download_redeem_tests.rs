//! Integration tests for download token redemption.

mod test_utils;

use chrono::{Duration, Utc};
use fangate::analytics::{LoggingAnalyticsSink, LoggingPixelDispatcher};
use fangate::gate_access::{DownloadRedeemer, DownloadTokenIssuer, RedeemError};
use fangate::models::gate;
use fangate::repositories::{GateRepository, SubmissionRepository};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Statement};
use std::sync::Arc;
use test_utils::{create_gate, create_submission, setup_test_db_arc};

fn redeemer(db: &Arc<DatabaseConnection>) -> DownloadRedeemer {
    DownloadRedeemer::new(
        SubmissionRepository::new(Arc::clone(db)),
        GateRepository::new(Arc::clone(db)),
        Arc::new(LoggingAnalyticsSink),
        Arc::new(LoggingPixelDispatcher),
    )
}

fn issuer(db: &Arc<DatabaseConnection>) -> DownloadTokenIssuer {
    DownloadTokenIssuer::new(
        SubmissionRepository::new(Arc::clone(db)),
        GateRepository::new(Arc::clone(db)),
        24,
    )
}

async fn gate_by_id(db: &DatabaseConnection, id: uuid::Uuid) -> anyhow::Result<gate::Model> {
    Ok(gate::Entity::find_by_id(id)
        .one(db)
        .await?
        .expect("gate exists"))
}

#[tokio::test]
async fn redeem_returns_file_url_exactly_once() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let gate = create_gate(&db, |g| {
        g.file_url = "https://cdn.example.com/exclusive.wav".to_string();
    })
    .await?;
    let submission = create_submission(&db, gate.id).await?;
    let issued = issuer(&db).issue(submission.id).await?;

    let redeemed = redeemer(&db).redeem(&issued.token).await?;
    assert_eq!(redeemed.file_url, "https://cdn.example.com/exclusive.wav");
    assert_eq!(redeemed.gate_slug, gate.slug);

    let reloaded = gate_by_id(&db, gate.id).await?;
    assert_eq!(reloaded.download_count, 1);

    // Replay is rejected and the counter stays put.
    let err = redeemer(&db).redeem(&issued.token).await.unwrap_err();
    assert!(matches!(err, RedeemError::AlreadyUsed));
    assert_eq!(gate_by_id(&db, gate.id).await?.download_count, 1);

    Ok(())
}

#[tokio::test]
async fn expired_token_is_reported_distinctly_without_counting() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let gate = create_gate(&db, |_| {}).await?;
    let submission = create_submission(&db, gate.id).await?;

    let token = "cd".repeat(32);
    SubmissionRepository::new(Arc::clone(&db))
        .set_download_token(submission.id, &token, Utc::now() - Duration::minutes(1))
        .await?;

    let err = redeemer(&db).redeem(&token).await.unwrap_err();
    assert!(matches!(err, RedeemError::ExpiredToken));
    assert_eq!(gate_by_id(&db, gate.id).await?.download_count, 0);

    Ok(())
}

#[tokio::test]
async fn malformed_and_unknown_tokens_are_invalid() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;

    let svc = redeemer(&db);
    assert!(matches!(
        svc.redeem("not-a-token").await.unwrap_err(),
        RedeemError::InvalidToken
    ));
    assert!(matches!(
        svc.redeem(&"ef".repeat(32)).await.unwrap_err(),
        RedeemError::InvalidToken
    ));

    Ok(())
}

#[tokio::test]
async fn closed_gate_blocks_redemption_of_issued_token() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let gate = create_gate(&db, |_| {}).await?;
    let submission = create_submission(&db, gate.id).await?;
    let issued = issuer(&db).issue(submission.id).await?;

    // Gate is deactivated after the token was issued.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE gates SET active = 0 WHERE id = ?",
        [gate.id.into()],
    ))
    .await?;

    let err = redeemer(&db).redeem(&issued.token).await.unwrap_err();
    assert!(matches!(err, RedeemError::GateInactive));
    assert_eq!(gate_by_id(&db, gate.id).await?.download_count, 0);

    Ok(())
}

#[tokio::test]
async fn concurrent_redemptions_succeed_exactly_once() -> anyhow::Result<()> {
    let db = setup_test_db_arc().await?;
    let gate = create_gate(&db, |_| {}).await?;
    let submission = create_submission(&db, gate.id).await?;
    let issued = issuer(&db).issue(submission.id).await?;

    let a = redeemer(&db);
    let b = redeemer(&db);
    let token_a = issued.token.clone();
    let token_b = issued.token.clone();

    let (first, second) = tokio::join!(a.redeem(&token_a), b.redeem(&token_b));

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser.unwrap_err(), RedeemError::AlreadyUsed));
    assert_eq!(gate_by_id(&db, gate.id).await?.download_count, 1);

    Ok(())
}
