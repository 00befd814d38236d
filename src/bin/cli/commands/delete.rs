use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::OutputFormat;

pub async fn run(app: &App, card_id: Uuid, owner: Uuid, format: &OutputFormat) -> Result<()> {
    app.service
        .delete_card(card_id, owner)
        .await
        .with_context(|| format!("Failed to delete card {}", card_id))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "id": card_id.to_string(), "deleted": true });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Deleted card {}", card_id),
    }

    Ok(())
}
