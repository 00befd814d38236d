use anyhow::{Context, Result};
use uuid::Uuid;

use cadence_lib::flashcards::CardContent;

use crate::app::App;
use crate::render::terminal::{due_label, paint, Color};
use crate::OutputFormat;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    app: &App,
    owner: Uuid,
    collection: Uuid,
    front: String,
    back: String,
    topic: Option<String>,
    difficulty: Option<u8>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut content = CardContent::new(front, back);
    if let Some(topic) = topic {
        content = content.with_topic(topic);
    }
    if let Some(level) = difficulty {
        content = content.with_difficulty(level);
    }

    let card = app
        .service
        .create_card(owner, collection, content)
        .await
        .context("Failed to create card")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        OutputFormat::Plain => {
            println!("Created card {}", paint(&card.id.to_string(), Color::BOLD, use_color));
            println!("  Topic: {}", card.content.topic);
            println!("  Difficulty: {}", card.difficulty_level());
            println!("  Due: {}", due_label(card.next_review_date, app.today(), use_color));
        }
    }

    Ok(())
}
