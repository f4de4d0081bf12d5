//! `lockbox audit`: display the audit log.
//!
//! Usage:
//!   lockbox audit               # show last 50 entries
//!   lockbox audit --last 20     # show last 20
//!   lockbox audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditLog};
use crate::cli::output;
use crate::cli::{vaults_dir, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let since = since.map(parse_duration).transpose()?;

    let audit = AuditLog::open(&vaults_dir(cli)?)
        .ok_or_else(|| LockboxError::AuditError("failed to open audit database".into()))?;
    let entries = audit.query(last, since)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Parse a human-friendly duration like "7d", "24h" or "30m" into the
/// point in time that long ago.
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        LockboxError::CommandFailed(format!(
            "invalid duration '{input}' (use a form like 7d, 24h or 30m)"
        ))
    };

    let unit = input.chars().last().ok_or_else(invalid)?;
    let num: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;

    let duration = match unit {
        'd' => Duration::try_days(num),
        'h' => Duration::try_hours(num),
        'm' => Duration::try_minutes(num),
        _ => return Err(invalid()),
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(duration).ok_or_else(invalid)
}

fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Vault", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.vault.clone(),
            entry.details.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

fn colorize_operation(op: &str) -> String {
    match op {
        "create" | "restore" | "add" => style(op).green().to_string(),
        "update" | "rename" => style(op).blue().to_string(),
        "delete" | "remove" => style(op).red().to_string(),
        "passwd" => style(op).yellow().to_string(),
        "export" | "import" | "backup" => style(op).cyan().to_string(),
        _ => op.to_string(),
    }
}
