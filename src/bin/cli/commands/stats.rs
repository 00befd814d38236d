use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{mastery_label, paint, truncate, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    owner: Uuid,
    topics: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let stats = app
        .service
        .study_stats(owner)
        .await
        .context("Failed to compute study stats")?;
    let topic_stats = if topics {
        app.service
            .topic_stats(owner)
            .await
            .context("Failed to compute topic stats")?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&stats)?;
            output["studyProgress"] = serde_json::json!(stats.study_progress());
            if topics {
                output["topics"] = serde_json::to_value(&topic_stats)?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Cards:        {}", stats.total_cards);
            println!(
                "Due:          {}",
                paint(&stats.due_cards.to_string(), Color::YELLOW, use_color)
            );
            println!("New:          {}", stats.new_cards);
            println!("Topics:       {}", stats.total_topics);
            println!("Average ease: {:.2}", stats.average_ease_factor);
            println!("Progress:     {}%", stats.study_progress());

            if topics && !topic_stats.is_empty() {
                let width = topic_stats
                    .iter()
                    .map(|t| t.topic.chars().count())
                    .max()
                    .unwrap_or(5)
                    .clamp(5, 30);

                println!();
                println!("{:<width$}  Cards  Due  Ease  Mastery", "Topic", width = width);
                println!("{}", "\u{2500}".repeat(width + 31));
                for topic in &topic_stats {
                    println!(
                        "{:<width$}  {:>5}  {:>3}  {:.2}  {}",
                        truncate(&topic.topic, width),
                        topic.total_cards,
                        topic.due_cards,
                        topic.average_ease,
                        mastery_label(topic.mastery),
                        width = width
                    );
                }
            }
        }
    }

    Ok(())
}
