//! The `pathmind paths` and `pathmind enroll` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use pathmind_core::model::{LearningPathDetail, PathId, UserId};

pub async fn execute(
    path_id: Option<PathId>,
    user: Option<UserId>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;
    let user_id = super::resolve_user(user, &config)?;
    if let Some(path_id) = path_id {
        let detail = backend.learning_path(user_id, path_id).await?;
        print_detail(&detail);
        return Ok(());
    }

    let paths = backend.list_learning_paths(user_id).await?;

    if paths.is_empty() {
        println!("No learning paths available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Difficulty", "Steps", "Estimated time", "Enrolled"]);
    for path in &paths {
        table.add_row(vec![
            Cell::new(path.id),
            Cell::new(&path.title),
            Cell::new(path.difficulty.as_deref().unwrap_or("-")),
            Cell::new(path.total_steps),
            Cell::new(path.estimated_time.as_deref().unwrap_or("-")),
            Cell::new(if path.enrolled { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
    println!("\nShow the steps of one with: pathmind paths --id <ID>");

    Ok(())
}

fn print_detail(detail: &LearningPathDetail) {
    let path = &detail.path;
    println!("{} (path {})", path.title, path.id);
    if !path.description.is_empty() {
        println!("{}", path.description);
    }
    println!(
        "Estimated time: {} | Difficulty: {}",
        path.estimated_time.as_deref().unwrap_or("unknown"),
        path.difficulty.as_deref().unwrap_or("-")
    );
    if !path.tags.is_empty() {
        println!("Tags: {}", path.tags.join(", "));
    }

    if path.enrolled {
        println!(
            "Progress: {} / {} steps ({}%)",
            detail.completed_steps,
            detail.nodes.len().max(path.total_steps as usize),
            detail.progress
        );
    } else {
        println!("Not enrolled. Join with: pathmind enroll --path {}", path.id);
    }

    if detail.nodes.is_empty() {
        println!("\nThis path has no steps yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Step", "Type", "Status"]);
    for (i, node) in detail.nodes.iter().enumerate() {
        let step = match node.test_id {
            Some(test_id) => format!("{} (pathmind take --test {test_id})", node.title),
            None => node.title.clone(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(step),
            Cell::new(&node.kind),
            Cell::new(node.status),
        ]);
    }
    println!();
    println!("{table}");
}

pub async fn enroll(path_id: PathId, user: Option<UserId>, config_path: Option<PathBuf>) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;
    let user_id = super::resolve_user(user, &config)?;
    let enrollment = backend.enroll(user_id, path_id).await?;

    println!(
        "Enrolled user {} in learning path {} ({}, {:.0}% complete)",
        enrollment.user_id,
        enrollment.path_id,
        enrollment.enrolled_at.format("%Y-%m-%d %H:%M UTC"),
        enrollment.progress * 100.0
    );

    Ok(())
}
