//! The `pathmind validate` command: answer-key coverage and authoring warnings.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use pathmind_core::bank::{load_bank_directory, parse_bank, validate_bank};
use pathmind_core::model::format_clock;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let banks = if bank_path.is_dir() {
        load_bank_directory(&bank_path)?
    } else {
        vec![parse_bank(&bank_path)?]
    };

    if banks.is_empty() {
        println!("No question banks found in {}", bank_path.display());
        return Ok(());
    }

    let checked: Vec<_> = banks.iter().map(|b| (b, validate_bank(b))).collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Questions", "Time limit", "Answer key", "Topics", "Warnings"]);
    for (bank, warnings) in &checked {
        let topics = bank.topics();
        table.add_row(vec![
            Cell::new(bank.summary.id),
            Cell::new(&bank.summary.title),
            Cell::new(bank.questions.len()),
            Cell::new(format_clock(bank.summary.time_limit_secs)),
            Cell::new(format!("{}/{}", bank.keyed_questions(), bank.questions.len())),
            Cell::new(if topics.is_empty() {
                "-".to_string()
            } else {
                topics.into_iter().collect::<Vec<_>>().join(", ")
            }),
            Cell::new(warnings.len()),
        ]);
    }
    println!("{table}");

    let mut total_warnings = 0;
    for (bank, warnings) in checked.iter().filter(|(_, w)| !w.is_empty()) {
        println!("\nTest {} ({}):", bank.summary.id, bank.summary.title);
        for w in warnings {
            match &w.question_id {
                Some(id) => println!("  [{id}] {}", w.message),
                None => println!("  {}", w.message),
            }
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
