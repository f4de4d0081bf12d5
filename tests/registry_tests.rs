//! Integration tests for the vault registry.

use std::fs;

use lockbox::config::{ListOrder, Settings};
use lockbox::crypto::KdfParams;
use lockbox::errors::LockboxError;
use lockbox::registry::VaultRegistry;
use lockbox::vault::EntryFields;
use tempfile::TempDir;

fn settings() -> Settings {
    Settings::default().with_kdf_params(KdfParams::MINIMUM)
}

fn names(registry: &VaultRegistry) -> Vec<String> {
    registry.list().into_iter().map(|v| v.name).collect()
}

#[test]
fn rename_shows_new_name_only() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    registry.create("Personal", b"pw").unwrap();
    registry.create("Work", b"pw").unwrap();

    registry.rename("Personal", "Home").unwrap();

    let mut listed = names(&registry);
    listed.sort();
    assert_eq!(listed, ["Home", "Work"]);
    assert!(!registry.contains("Personal"));

    // The rename is on disk too.
    let reloaded = VaultRegistry::load(dir.path(), settings()).unwrap();
    assert!(reloaded.contains("Home"));
    assert!(!reloaded.contains("Personal"));
}

#[test]
fn renamed_vault_still_opens() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    registry.create("Personal", b"pw").unwrap();

    let session = registry.open("Personal", b"pw").unwrap();
    session.add(EntryFields::new("Gmail")).unwrap();
    session.save().unwrap();
    registry.close("Personal").unwrap();

    registry.rename("Personal", "Home").unwrap();
    let session = registry.open("Home", b"pw").unwrap();
    assert_eq!(session.list().unwrap().len(), 1);
}

#[test]
fn duplicate_names_are_refused() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    registry.create("Work", b"pw").unwrap();

    assert!(matches!(
        registry.create("Work", b"pw"),
        Err(LockboxError::DuplicateName(_))
    ));
    assert_eq!(registry.list().len(), 1);
}

#[test]
fn unknown_names_are_reported() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();

    assert!(matches!(
        registry.open("nope", b"pw"),
        Err(LockboxError::UnknownVault(_))
    ));
    assert!(matches!(
        registry.rename("nope", "x"),
        Err(LockboxError::UnknownVault(_))
    ));
    assert!(matches!(
        registry.remove("nope"),
        Err(LockboxError::UnknownVault(_))
    ));
}

#[test]
fn list_defaults_to_creation_order() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    for name in ["zeta", "alpha", "mid"] {
        registry.create(name, b"pw").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    assert_eq!(names(&registry), ["zeta", "alpha", "mid"]);

    let by_name = Settings {
        list_order: ListOrder::Name,
        ..settings()
    };
    let registry = VaultRegistry::load(dir.path(), by_name).unwrap();
    assert_eq!(names(&registry), ["alpha", "mid", "zeta"]);
}

#[test]
fn backup_is_a_verbatim_copy() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    let info = registry.create("Work", b"pw").unwrap();

    let dest = dir.path().join("work-backup.vault");
    let digest = registry.backup("Work", &dest).unwrap();

    assert_eq!(fs::read(&dest).unwrap(), fs::read(&info.location).unwrap());
    assert_eq!(digest.len(), 64);

    // Never overwrites.
    assert!(matches!(
        registry.backup("Work", &dest),
        Err(LockboxError::VaultAlreadyExists(_))
    ));
}

#[test]
fn restore_registers_a_backup_under_a_new_name() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    registry.create("Work", b"pw").unwrap();
    let session = registry.open("Work", b"pw").unwrap();
    session
        .add(EntryFields::new("VPN").password("tunnel"))
        .unwrap();
    session.save().unwrap();
    registry.close("Work").unwrap();

    let backup = dir.path().join("work.bak");
    registry.backup("Work", &backup).unwrap();

    let restored = registry.restore(&backup, "Work (restored)").unwrap();
    assert_ne!(restored.location, registry.location("Work").unwrap());

    let session = registry.open("Work (restored)", b"pw").unwrap();
    let entries = session.list().unwrap();
    assert_eq!(entries[0].password.expose(), "tunnel");

    assert!(matches!(
        registry.restore(&backup, "Work"),
        Err(LockboxError::DuplicateName(_))
    ));
}

#[test]
fn remove_leaves_other_vaults_alone() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    let gone = registry.create("Old", b"pw").unwrap();
    let kept = registry.create("Keep", b"pw").unwrap();

    registry.remove("Old").unwrap();

    assert!(!gone.location.exists());
    assert!(kept.location.exists());
    assert_eq!(names(&registry), ["Keep"]);
}

#[test]
fn registry_holds_no_secrets() {
    let dir = TempDir::new().unwrap();
    let mut registry = VaultRegistry::load(dir.path(), settings()).unwrap();
    registry.create("Personal", b"super-secret-master").unwrap();

    let index = fs::read_to_string(dir.path().join("registry.json")).unwrap();
    assert!(index.contains("Personal"));
    assert!(!index.contains("super-secret-master"));
}

#[test]
fn concurrent_handles_do_not_lose_vaults() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    std::thread::scope(|s| {
        for t in 0..4 {
            s.spawn(move || {
                let mut registry = VaultRegistry::load(root, settings()).unwrap();
                for n in 0..3 {
                    let name = format!("t{t}-v{n}");
                    registry.create(&name, b"pw").unwrap();
                    drop(registry.open(&name, b"pw").unwrap());
                }
            });
        }
    });

    let registry = VaultRegistry::load(root, settings()).unwrap();
    let listed = registry.list();
    assert_eq!(listed.len(), 12);
    assert!(listed.iter().all(|v| v.location.exists()));
    assert!(listed.iter().all(|v| v.last_opened_at.is_some()));
}
