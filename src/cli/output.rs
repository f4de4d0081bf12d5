//! Styled terminal output for the `lockbox` commands.
//!
//! Status lines go through the one-line helpers below; listings are
//! rendered with comfy-table.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::registry::VaultInfo;
use crate::vault::{Entry, VaultStats};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Green check mark, stdout.
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Red cross, stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Dimmed hint line.
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of entries (Id, Service, Username, URL, Updated).
/// Passwords are never shown here.
pub fn print_entries_table(vault: &str, entries: &[Entry]) {
    if entries.is_empty() {
        info("No matching entries.");
        tip(&format!("Run `lockbox add {vault} <SERVICE>` to add one."));
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Service", "Username", "URL", "Updated"]);

    for e in entries {
        table.add_row(vec![
            e.id.0.to_string(),
            e.service.clone(),
            e.username.clone(),
            e.url.clone(),
            e.updated_at.format(TIME_FORMAT).to_string(),
        ]);
    }

    println!("{table}");
}

/// Print one entry as a two-column table.
pub fn print_entry(entry: &Entry, show_password: bool) {
    let password = if show_password {
        entry.password.expose().to_string()
    } else if entry.password.is_empty() {
        String::new()
    } else {
        "********".to_string()
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Id".to_string(), entry.id.0.to_string()]);
    table.add_row(vec!["Service".to_string(), entry.service.clone()]);
    table.add_row(vec!["Username".to_string(), entry.username.clone()]);
    table.add_row(vec!["Password".to_string(), password]);
    table.add_row(vec!["URL".to_string(), entry.url.clone()]);
    table.add_row(vec!["Notes".to_string(), entry.notes.clone()]);
    table.add_row(vec![
        "Created".to_string(),
        entry.created_at.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        entry.updated_at.format(TIME_FORMAT).to_string(),
    ]);

    println!("{table}");
}

/// Print a table of registered vaults (Name, Created, Last opened, File).
pub fn print_vaults_table(vaults: &[VaultInfo]) {
    if vaults.is_empty() {
        info("No vaults yet.");
        tip("Run `lockbox create <NAME>` to create one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Created", "Last opened", "File"]);

    for v in vaults {
        table.add_row(vec![
            v.name.clone(),
            v.created_at.format(TIME_FORMAT).to_string(),
            v.last_opened_at
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "never".to_string()),
            v.location.display().to_string(),
        ]);
    }

    println!("{table}");
}

/// Print vault statistics.
pub fn print_stats(vault: &str, stats: &VaultStats) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![style(vault).bold().to_string(), String::new()]);
    table.add_row(vec!["Entries".to_string(), stats.total_entries.to_string()]);
    table.add_row(vec!["With password".to_string(), stats.with_password.to_string()]);
    table.add_row(vec!["With URL".to_string(), stats.with_url.to_string()]);
    table.add_row(vec![
        "Last updated".to_string(),
        stats
            .last_updated
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Format version".to_string(), stats.format_version.to_string()]);
    table.add_row(vec![
        "KDF".to_string(),
        format!(
            "Argon2id m={} KiB, t={}, p={}",
            stats.kdf_params.memory_kib, stats.kdf_params.iterations, stats.kdf_params.parallelism
        ),
    ]);

    println!("{table}");
}
