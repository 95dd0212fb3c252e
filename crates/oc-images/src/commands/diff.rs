//! Diff command

use anyhow::{Context, Result};
use oc_images_core::{Comparer, ComparisonReport};
use tabled::Table;

use super::Session;
use crate::cli::DiffArgs;
use crate::output;

/// Compare two collections and report differing NVRs and names
pub async fn run(args: DiffArgs, session: &Session) -> Result<()> {
    let comparer = Comparer::from_pointers(&args.first, &args.second, session.backend.clone())
        .with_concurrency(session.config.concurrency);

    let pb = output::spinner(
        &format!("Comparing {} and {}", args.first, args.second),
        session.progress && !args.json,
    );
    let report = comparer.compare().await;
    pb.finish_and_clear();
    let report = report
        .with_context(|| format!("Failed to compare {} with {}", args.first, args.second))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &ComparisonReport) {
    match nvr_table(report) {
        Some(table) => {
            output::header("Differing NVRs");
            println!("{}", table);
        }
        None => output::success("SHAs are all the same"),
    }

    for (title, table) in name_tables(report) {
        output::header(&title);
        println!("{}", table);
    }
}

/// Image, first NVR and second NVR for every differing image
fn nvr_table(report: &ComparisonReport) -> Option<Table> {
    if report.nvrs.is_empty() {
        return None;
    }

    let headers = [
        "Image".to_string(),
        report.names.first.clone(),
        report.names.second.clone(),
    ];
    let rows = report
        .nvrs
        .iter()
        .map(|d| [d.name.clone(), d.first.clone(), d.second.clone()]);
    Some(output::table(headers, rows))
}

/// One titled table per side that has names the other lacks
fn name_tables(report: &ComparisonReport) -> Vec<(String, Table)> {
    report
        .names
        .sides()
        .into_iter()
        .filter(|(_, only)| !only.is_empty())
        .map(|(side, only)| {
            let table = output::table(["Payload name"], only.iter().map(|n| [n.as_str()]));
            (format!("Only in {}", side), table)
        })
        .collect()
}
