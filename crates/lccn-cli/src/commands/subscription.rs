//! subscribe/list/show/delete commands

use anyhow::Result;
use lccn_core::types::{LccnSubscriptionFilter, Subscription};

use super::CommandContext;
use crate::utils::{format_datetime, read_json_arg};

pub async fn create(
    ctx: &CommandContext,
    callback_uri: &str,
    filter: Option<&str>,
    auth: Option<&str>,
) -> Result<()> {
    let filter: Option<LccnSubscriptionFilter> =
        filter.map(|f| read_json_arg(f, "filter")).transpose()?;
    let authentication: Option<serde_json::Value> =
        auth.map(|a| read_json_arg(a, "authentication")).transpose()?;

    let subscription = ctx
        .manager
        .create(callback_uri, authentication, filter.as_ref())
        .await?;

    if ctx.is_json() {
        ctx.print_json(&subscription.info())
    } else {
        println!("Created subscription {}", subscription.id);
        Ok(())
    }
}

pub async fn list(ctx: &CommandContext) -> Result<()> {
    let subscriptions = ctx.manager.list().await?;

    if ctx.is_json() {
        let infos: Vec<_> = subscriptions.iter().map(Subscription::info).collect();
        return ctx.print_json(&infos);
    }

    if subscriptions.is_empty() {
        println!("No subscriptions");
    }
    for s in &subscriptions {
        println!("{}  {}  {}", format_datetime(&s.created_at), s.id, s.callback_uri);
    }
    Ok(())
}

pub async fn show(ctx: &CommandContext, id: &str) -> Result<()> {
    let subscription = ctx.manager.show(id).await?;

    if ctx.is_json() {
        ctx.print_json(&subscription.info())
    } else {
        println!("Id:           {}", subscription.id);
        println!("Callback URI: {}", subscription.callback_uri);
        println!("Created:      {}", format_datetime(&subscription.created_at));
        println!("Filter:       {}", subscription.filter.to_document()?);
        Ok(())
    }
}

pub async fn delete(ctx: &CommandContext, id: &str) -> Result<()> {
    ctx.manager.destroy(id).await?;

    if ctx.is_json() {
        ctx.print_json(&serde_json::json!({ "id": id, "deleted": true }))
    } else {
        println!("Deleted subscription {}", id);
        Ok(())
    }
}
