use anyhow::{Context, Result};
use uuid::Uuid;

use crate::app::App;
use crate::render::terminal::{paint, truncate, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    owner: Uuid,
    minutes: f64,
    days: u32,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let plan = app
        .service
        .plan_session(owner, minutes)
        .await
        .context("Failed to plan session")?;
    let schedule = app
        .service
        .study_schedule(owner, days)
        .await
        .context("Failed to build study schedule")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "session": plan,
                "schedule": schedule,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Session: {} cards, about {} min ({} due in total)",
                plan.cards.len(),
                plan.estimated_minutes,
                plan.total_due
            );
            for card in &plan.cards {
                println!("  {}  {}", card.id, truncate(&card.content.front, 50));
            }

            println!();
            for day in &schedule {
                let count = day.cards.len();
                let label = day.date.format("%a %Y-%m-%d").to_string();
                if count == 0 {
                    println!("{}  -", paint(&label, Color::GRAY, use_color));
                } else {
                    println!("{}  {} cards", label, count);
                }
            }
        }
    }

    Ok(())
}
