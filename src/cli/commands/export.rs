//! `lockbox export`: dump a vault's entries as plaintext JSON.
//!
//! Usage:
//!   lockbox export Personal                  # print to stdout
//!   lockbox export Personal -o backup.json   # new file, owner-only

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{log_audit, open_vault, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `export` command.
pub fn execute(cli: &Cli, vault: &str, out: Option<&Path>) -> Result<()> {
    let (_registry, session) = open_vault(cli, vault)?;
    let doc = session.export()?;
    session.close();

    let json = Zeroizing::new(
        serde_json::to_string_pretty(&doc)
            .map_err(|e| LockboxError::SerializationError(format!("export: {e}")))?,
    );

    match out {
        Some(path) => {
            write_new_file(path, json.as_bytes())?;
            log_audit(
                cli,
                "export",
                vault,
                Some(&format!("{} entries to {}", doc.entries.len(), path.display())),
            );
            output::success(&format!(
                "Exported {} entries to {}",
                doc.entries.len(),
                path.display()
            ));
            output::warning("The export file contains plaintext passwords.");
        }
        None => {
            println!("{}", json.as_str());
            log_audit(
                cli,
                "export",
                vault,
                Some(&format!("{} entries to stdout", doc.entries.len())),
            );
        }
    }

    Ok(())
}

/// Write `bytes` to a file that must not exist yet, owner-only from the
/// moment it is created.
fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = create_private(path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => LockboxError::CommandFailed(format!(
            "{} already exists; refusing to overwrite it",
            path.display()
        )),
        _ => e.into(),
    })?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn create_private(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn export_file_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, "keep me").unwrap();

        let result = write_new_file(&path, b"{}");
        assert!(matches!(result, Err(LockboxError::CommandFailed(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[cfg(unix)]
    #[test]
    fn export_file_is_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        write_new_file(&path, b"{}").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }
}
