//! match command - resolve delivery targets for a notification

use anyhow::Result;
use lccn_core::types::LcmNotificationEvent;

use super::CommandContext;
use crate::utils::read_json_arg;

pub async fn execute(ctx: &CommandContext, event: &str) -> Result<()> {
    let event: LcmNotificationEvent = read_json_arg(event, "event")?;
    let targets = ctx.router.find_matching_subscriptions(&event).await?;

    if ctx.is_json() {
        // Credentials stay out of command output
        let summary: Vec<_> = targets
            .iter()
            .map(|t| {
                serde_json::json!({
                    "subscriptionId": t.subscription_id,
                    "callbackUri": t.callback_uri,
                })
            })
            .collect();
        return ctx.print_json(&summary);
    }

    println!("{} subscription(s) matched", targets.len());
    for t in &targets {
        println!("{}  {}", t.subscription_id, t.callback_uri);
    }
    Ok(())
}
