//! Key registration command handler

use crate::config::Config;
use crate::domain::UserId;
use crate::services::Reply;
use crate::state::SharedState;

/// Runs the same validation as the chat dialogue: format check, one canary
/// query, then commit.
pub async fn cmd_token(config: &Config, user: i64, key: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let user_id = UserId::new(user);

    state.onboarding.begin(user_id).await;
    let reply = state.onboarding.submit(user_id, key).await?;

    match &reply {
        Reply::Committed => println!("✓ {}", reply.message()),
        _ => {
            state.onboarding.cancel(user_id).await;
            anyhow::bail!("{}", reply.message());
        }
    }

    Ok(())
}
