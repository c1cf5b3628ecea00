//! The `pathmind init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("pathmind.toml").exists() {
        println!("pathmind.toml already exists, skipping.");
    } else {
        std::fs::write("pathmind.toml", SAMPLE_CONFIG)?;
        println!("Created pathmind.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit pathmind.toml with your user id and backend URL");
    println!("  2. Run: pathmind validate --bank banks/example.toml");
    println!("  3. Run: pathmind tests");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# pathmind configuration

user_id = 1
default_time_limit_secs = 1800

# Serve tests from the bundled banks when the backend cannot be reached.
offline_fallback = false

[backend]
type = "http"
base_url = "http://localhost:8000"
token = "${PATHMIND_TOKEN}"
timeout_secs = 30

# To practice without a server, use the in-memory backend instead:
# [backend]
# type = "mock"
# bank_dir = "banks"
"#;

const EXAMPLE_BANK: &str = r#"[test]
id = 100
title = "Example test"
description = "A two-question bank to get started"
difficulty = "beginner"
time_limit_secs = 300
tags = ["example"]
instructions = ["Pick one option per question."]

[[questions]]
id = 1
text = "Which keyword defines a function in Python?"
explanation = "Functions are introduced with `def`."
correct_option = "b"
topic = "Syntax"
options = [
    { id = "a", text = "function" },
    { id = "b", text = "def" },
    { id = "c", text = "define" },
]

[[questions]]
id = 2
text = "Which HTML tag creates a hyperlink?"
explanation = "The anchor element `<a>` links to another resource."
correct_option = "b"
topic = "HTML"
options = [
    { id = "a", text = "<link>" },
    { id = "b", text = "<a>" },
    { id = "c", text = "<href>" },
]
"#;
