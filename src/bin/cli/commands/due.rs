use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{due_label, truncate};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    owner: Uuid,
    limit: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let due = app
        .service
        .get_due_cards(owner, limit)
        .await
        .context("Failed to load due cards")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&due)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due.");
                return Ok(());
            }

            let today = app.today();
            for card in &due {
                println!(
                    "{}  {:<40}  ef {:.2}  {}",
                    card.card_id,
                    truncate(&card.content.front, 40),
                    card.ease_factor,
                    due_label(card.next_review_date, today, use_color)
                );
            }
            println!("\n{} cards due", due.len());
        }
    }

    Ok(())
}
