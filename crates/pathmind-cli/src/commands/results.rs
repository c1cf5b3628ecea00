//! The `pathmind results` command.

use std::path::PathBuf;

use anyhow::Result;

use pathmind_core::model::{TestId, UserId};
use pathmind_core::report::ResultsReport;

pub async fn execute(
    test_id: TestId,
    user: Option<UserId>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "markdown" | "json"),
        "unknown format '{format}' (expected text, markdown or json)"
    );

    let (config, backend) = super::connect(config_path)?;
    let user_id = super::resolve_user(user, &config)?;

    let result = backend.fetch_results(test_id, user_id).await?;
    // title only
    let summary = backend.test_details(test_id).await.ok();

    let report = ResultsReport::new(test_id, summary.as_ref(), user_id, result);
    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" => print!("{}", report.to_markdown()),
        _ => print!("{}", report.to_text()),
    }

    Ok(())
}
