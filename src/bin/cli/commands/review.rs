use anyhow::{Context, Result};
use uuid::Uuid;

use cadence_lib::flashcards::algorithm::format_interval;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    card_id: Uuid,
    owner: Uuid,
    quality: i32,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let outcome = app
        .service
        .review_card(card_id, owner, quality)
        .await
        .with_context(|| format!("Failed to review card {}", card_id))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => {
            let color = if quality < 3 { Color::RED } else { Color::GREEN };
            println!(
                "Next review {} ({})",
                paint(&outcome.next_review_date.to_string(), color, use_color),
                format_interval(outcome.interval_days)
            );
            println!("  Ease factor: {:.2}", outcome.ease_factor);
            println!("  Reviews: {}", outcome.review_count);
        }
    }

    Ok(())
}
