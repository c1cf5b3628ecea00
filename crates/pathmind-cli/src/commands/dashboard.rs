//! The `pathmind dashboard` command: progress overview and suggested paths.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use pathmind_core::model::{Activity, UserId};

pub async fn execute(user: Option<UserId>, config_path: Option<PathBuf>) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;
    let user_id = super::resolve_user(user, &config)?;

    let (progress, recommended) = tokio::try_join!(
        backend.user_progress(user_id),
        backend.recommended_paths(user_id)
    )?;

    println!("Dashboard for user {user_id}");
    match &progress.learning_style {
        Some(style) => println!("Learning style: {style}"),
        None => println!("Learning style: not assessed yet"),
    }
    println!("Overall progress: {}%", progress.overall_progress);
    println!(
        "Learning paths: {} active, {} completed",
        progress.active_paths, progress.completed_paths
    );
    println!("Completed tests: {}", progress.completed_tests);

    println!("\nRecent activity");
    if progress.recent_activities.is_empty() {
        println!("No recent activity.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Type", "Title", "Date", "Result"]);
        for activity in &progress.recent_activities {
            table.add_row(vec![
                Cell::new(activity.kind),
                Cell::new(&activity.title),
                Cell::new(&activity.date),
                Cell::new(activity_result(activity)),
            ]);
        }
        println!("{table}");
    }

    println!("\nRecommended paths");
    if recommended.is_empty() {
        println!("No recommendations right now.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Difficulty", "Estimated time"]);
    for path in &recommended {
        table.add_row(vec![
            Cell::new(path.id),
            Cell::new(&path.title),
            Cell::new(path.difficulty.as_deref().unwrap_or("-")),
            Cell::new(path.estimated_time.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
    println!("\nJoin one with: pathmind enroll --path <ID>");

    Ok(())
}

fn activity_result(activity: &Activity) -> String {
    match (activity.score, activity.progress) {
        (Some(score), _) => format!("score {score}%"),
        (None, Some(progress)) => format!("{progress}% complete"),
        (None, None) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathmind_core::model::ActivityKind;

    #[test]
    fn activity_results() {
        let mut activity = Activity {
            kind: ActivityKind::Test,
            title: "Python fundamentals".into(),
            date: "2026-01-05".into(),
            score: Some(80),
            progress: None,
        };
        assert_eq!(activity_result(&activity), "score 80%");
        activity.score = None;
        activity.progress = Some(40);
        assert_eq!(activity_result(&activity), "40% complete");
        activity.progress = None;
        assert_eq!(activity_result(&activity), "-");
    }
}
