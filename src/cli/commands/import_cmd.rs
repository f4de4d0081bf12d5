//! `lockbox import`: merge entries from an export file into a vault.
//!
//! Entries that match an existing one on service and username are
//! handled by `--policy`: `create` (default) adds a second entry,
//! `skip` keeps the existing one, `replace` overwrites it.

use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{log_audit, open_vault, Cli};
use crate::errors::{LockboxError, Result};
use crate::vault::transfer::EXPORT_VERSION;
use crate::vault::{ImportPolicy, VaultExport};

/// Execute the `import` command.
pub fn execute(cli: &Cli, vault: &str, file: &Path, policy: &str) -> Result<()> {
    let policy: ImportPolicy = policy.parse().map_err(LockboxError::CommandFailed)?;
    let doc = read_export(file)?;

    let (_registry, session) = open_vault(cli, vault)?;
    let report = session.import(&doc, policy)?;
    if report.changed() {
        session.save()?;
    }
    session.close();

    let summary = format!(
        "{} created, {} skipped, {} replaced",
        report.created, report.skipped, report.replaced
    );
    log_audit(cli, "import", vault, Some(&summary));
    output::success(&format!(
        "Imported {} into '{vault}': {summary}",
        file.display()
    ));

    Ok(())
}

/// Read and parse an export document.
fn read_export(file: &Path) -> Result<VaultExport> {
    if !file.exists() {
        return Err(LockboxError::CommandFailed(format!(
            "import file not found: {}",
            file.display()
        )));
    }
    let contents = Zeroizing::new(std::fs::read_to_string(file)?);
    let doc: VaultExport = serde_json::from_str(&contents).map_err(|e| {
        LockboxError::SerializationError(format!("{}: {e}", file.display()))
    })?;
    if doc.version != EXPORT_VERSION {
        return Err(LockboxError::SerializationError(format!(
            "{}: unsupported export version {}",
            file.display(),
            doc.version
        )));
    }
    Ok(doc)
}
