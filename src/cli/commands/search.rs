//! Inline query command handler

use crate::config::Config;
use crate::domain::UserId;
use crate::domain::events::NotificationEvent;
use crate::models::ItemKind;
use crate::state::SharedState;

pub async fn cmd_search(config: &Config, user: i64, query: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let mut notices = state.event_bus.subscribe();
    let user_id = UserId::new(user);

    let response = state.resolver.resolve(user_id, query).await?;

    if response.items.is_empty() {
        println!("No results.");
    }

    for (i, item) in response.items.iter().enumerate() {
        match item.kind {
            ItemKind::Result => {
                println!("{}. {}", i + 1, item.title);
                if let Some(url) = &item.url {
                    println!("   {url}");
                }
                if !item.description.is_empty() {
                    println!("   {}", item.description);
                }
                if let Some(thumb) = &item.thumbnail_url {
                    println!("   thumbnail: {thumb}");
                }
            }
            ItemKind::Notice => {
                println!("[{}] {}", item.id, item.title);
                println!("   {}", item.description);
            }
        }
    }

    while let Ok(event) = notices.try_recv() {
        if let NotificationEvent::UserNotice { user_id: to, message } = event
            && to == user_id
        {
            println!();
            println!("Private notice for {to}:");
            println!("{message}");
        }
    }

    Ok(())
}
