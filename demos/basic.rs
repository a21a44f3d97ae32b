//! In-memory session store walkthrough
//!
//! Creates a session, binds it to a user, stores a JSON payload, signs the
//! user out of their other sessions and lets the sweeper purge an expired one.
//!
//! Run with: cargo run --example basic

use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use db_session::session::encode_data;
use db_session::{
    open_memory_store, spawn_expiry_sweeper, NewSession, SessionConfig, SessionError,
    SessionUpdate,
};

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = SessionConfig::default().with_sweep_interval(Duration::from_millis(200));
    let store = open_memory_store();

    let token = store.create(config.new_session()).await?;
    println!("created session {}", token);

    let user = Uuid::new_v4();
    store
        .update(
            &token,
            SessionUpdate::new()
                .with_user_id(user)
                .with_data(encode_data(&json!({ "cart": ["apple", "pear"] }))?),
        )
        .await?;

    let session = store.read(&token).await?.ok_or_else(|| {
        SessionError::StoreError("session vanished right after creation".to_string())
    })?;
    let cart: Option<serde_json::Value> = session.decode_data()?;
    println!("user {:?} cart {:?}", session.user_id, cart);

    let csrf = store.set_csrf(&token).await?;
    println!("rotated csrf token: {:?}", csrf);

    // Same user logged in from a second device
    let other = store.create(config.new_session().with_user_id(user)).await?;
    let removed = store.delete_other(&token, user).await?;
    println!("signed out {} other session(s), {} is gone", removed, other);

    let stale = store
        .create(NewSession::expiring_at(Utc::now() - chrono::Duration::seconds(1)))
        .await?;
    let sweeper = spawn_expiry_sweeper(store.clone(), config.sweep_interval)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "stale session purged: {}",
        store.read(&stale).await?.is_none()
    );
    sweeper.abort();

    store.delete(&token).await?;
    Ok(())
}
