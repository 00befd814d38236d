use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Fields to replace; unset ones keep their current value
pub struct ContentEdit {
    pub front: Option<String>,
    pub back: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<u8>,
}

impl ContentEdit {
    fn is_empty(&self) -> bool {
        self.front.is_none()
            && self.back.is_none()
            && self.topic.is_none()
            && self.difficulty.is_none()
    }
}

pub async fn run(
    app: &App,
    card_id: Uuid,
    owner: Uuid,
    edit: ContentEdit,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    if edit.is_empty() {
        bail!("Nothing to change: pass --front, --back, --topic or --difficulty");
    }

    let card = app
        .service
        .get_card(card_id, owner)
        .await
        .with_context(|| format!("Failed to load card {}", card_id))?;

    let mut content = card.content;
    if let Some(front) = edit.front {
        content.front = front;
    }
    if let Some(back) = edit.back {
        content.back = back;
    }
    if let Some(topic) = edit.topic {
        content.topic = topic;
    }
    if let Some(level) = edit.difficulty {
        content.difficulty_level = level;
    }

    let updated = app
        .service
        .update_card_content(card_id, owner, content)
        .await
        .with_context(|| format!("Failed to update card {}", card_id))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        OutputFormat::Plain => {
            println!("Updated card {}", paint(&updated.id.to_string(), Color::BOLD, use_color));
            println!("  Front: {}", updated.content.front);
            println!("  Back: {}", updated.content.back);
        }
    }

    Ok(())
}
