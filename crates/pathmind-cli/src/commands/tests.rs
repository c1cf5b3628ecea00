//! The `pathmind tests` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use pathmind_core::model::{format_clock, TestFilter, UserId};

pub async fn execute(
    filter: TestFilter,
    completed: bool,
    user: Option<UserId>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;

    if completed {
        let user_id = super::resolve_user(user, &config)?;
        let tests: Vec<_> = backend
            .completed_tests(user_id)
            .await?
            .into_iter()
            .filter(|t| filter.matches_completed(t))
            .collect();
        if tests.is_empty() {
            println!("No completed tests.");
            return Ok(());
        }

        let mut table = Table::new();
        table.set_header(vec!["ID", "Title", "Score", "Completed"]);
        for test in &tests {
            table.add_row(vec![
                Cell::new(test.id),
                Cell::new(&test.title),
                Cell::new(format!("{}%", test.score)),
                Cell::new(
                    test.completed_at
                        .map(|at| at.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".into()),
                ),
            ]);
        }
        println!("{table}");
        println!("\nReview one with: pathmind results --test <ID>");
        return Ok(());
    }

    let tests: Vec<_> = backend
        .list_tests()
        .await?
        .into_iter()
        .filter(|t| filter.matches(t))
        .collect();
    if tests.is_empty() {
        println!("No tests available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Difficulty", "Questions", "Time limit", "Tags"]);
    for test in &tests {
        table.add_row(vec![
            Cell::new(test.id),
            Cell::new(&test.title),
            Cell::new(&test.difficulty),
            Cell::new(test.question_count),
            Cell::new(format_clock(test.time_limit_secs)),
            Cell::new(test.tags.join(", ")),
        ]);
    }
    println!("{table}");
    println!("\nStart one with: pathmind take --test <ID>");

    Ok(())
}
