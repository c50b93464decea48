use anyhow::{Context, Result};
use audit::{read_entries, verify_chain};
use colored::*;
use std::path::Path;

/// Verify the hash chain of an audit log. Returns whether the chain is intact.
pub fn verify(path: &Path) -> Result<bool> {
    let intact = verify_chain(path)
        .with_context(|| format!("Failed to read audit log {}", path.display()))?;
    let count = read_entries(path).map(|entries| entries.len()).unwrap_or(0);

    if intact {
        println!(
            "{} {} ({} entries)",
            "OK".green().bold(),
            path.display(),
            count
        );
    } else {
        println!(
            "{} {} has been modified or truncated",
            "FAILED".red().bold(),
            path.display()
        );
    }
    Ok(intact)
}

/// Print the entries of an audit log
pub fn show(path: &Path, format: &str) -> Result<()> {
    let entries = read_entries(path)
        .with_context(|| format!("Failed to read audit log {}", path.display()))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No unauthorized access recorded".yellow());
        return Ok(());
    }

    for entry in &entries {
        let record = &entry.record;
        let who = match (&record.user_id, record.role) {
            (Some(user), Some(role)) => format!("{} ({})", user, role),
            _ => "anonymous".to_string(),
        };
        println!(
            "{} {} {} {} [{}]",
            record.timestamp.to_rfc3339().dimmed(),
            record.reason.to_string().red(),
            who.cyan(),
            record.requirements_label(),
            record.enterprise_id.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{} {}", "Total:".bold(), entries.len());
    Ok(())
}
