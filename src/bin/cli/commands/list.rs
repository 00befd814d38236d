use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{due_label, truncate};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    owner: Uuid,
    collection: Uuid,
    page: usize,
    limit: usize,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let listing = app
        .service
        .list_collection_cards(owner, collection, page, limit)
        .await
        .context("Failed to list cards")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Plain => {
            if listing.cards.is_empty() {
                println!("No cards found.");
                return Ok(());
            }

            let today = app.today();
            for card in &listing.cards {
                println!(
                    "{}  {:<40}  {:<12}  {}",
                    card.id,
                    truncate(&card.content.front, 40),
                    truncate(&card.content.topic, 12),
                    due_label(card.next_review_date, today, use_color)
                );
            }
            println!(
                "\nPage {} of {} ({} cards)",
                listing.current_page,
                listing.total_pages.max(1),
                listing.total_count
            );
        }
    }

    Ok(())
}
