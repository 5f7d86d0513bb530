//! Integration tests for defining models from a folder of definition files.

use ormdb_definer::{
    define_from_folder, Catalog, DataType, DefineOptions, DefinerErrorKind, LoadOptions,
    OptionsFile,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn example_folder() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "Task2.json",
        r#"{ "fields": { "name": "STRING(50)" } }"#,
    );
    write(dir.path(), "User2.toml", "[fields]\nname = \"STRING(50)\"\n");
    dir
}

#[test]
fn test_defines_all_models() {
    let dir = example_folder();
    let mut catalog = Catalog::new();
    let defined = define_from_folder(&mut catalog, dir.path(), &DefineOptions::default()).unwrap();

    assert!(catalog.contains("Task2"));
    assert!(catalog.contains("User2"));
    assert_eq!(defined.models.len(), 2);
    assert_eq!(
        catalog.model("User2").unwrap().get_attribute("name").unwrap().data_type,
        Some(DataType::string(50))
    );
}

#[test]
fn test_relationships_across_files() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "Project.json",
        r#"{
            "fields": { "title": "TEXT" },
            "manyToMany": {
                "Member": { "as": "Members", "asReverse": "Projects", "onDelete": "CASCADE" }
            }
        }"#,
    );
    write(
        dir.path(),
        "Member.toml",
        r#"
[fields]
name = "STRING(100)"
nickname = false

[fields.LeadId]
reference = "Member"
as = "Lead"
asReverse = "Followers"

[options]
tableName = "people"
"#,
    );

    let mut catalog = Catalog::new();
    let defined = define_from_folder(&mut catalog, dir.path(), &DefineOptions::default()).unwrap();
    assert_eq!(defined.join_models, ["ProjectMember"]);

    let member = catalog.model("Member").unwrap();
    assert_eq!(member.table_name, "people");
    assert!(!member.has_attribute("nickname"));
    assert!(member.association("Lead").is_some());
    assert!(member.association("Followers").is_some());
    assert!(member.association("Projects").is_some());

    let members = catalog
        .model("Project")
        .unwrap()
        .association("Members")
        .unwrap();
    assert_eq!(members.through.as_deref(), Some("ProjectMember"));
    assert_eq!(
        members.on_delete,
        Some(ormdb_definer::ReferentialAction::Cascade)
    );
}

#[test]
fn test_prefixed_names() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "billing/Invoice.json", r#"{ "fields": {} }"#);

    let options = DefineOptions::new().with_load_options(LoadOptions {
        flatten_prefix: true,
        ..LoadOptions::default()
    });
    let mut catalog = Catalog::new();
    define_from_folder(&mut catalog, dir.path(), &options).unwrap();

    assert!(catalog.contains("BillingInvoice"));
}

#[test]
fn test_missing_fields_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Broken.json", r#"{ "options": {} }"#);

    let mut catalog = Catalog::new();
    let err =
        define_from_folder(&mut catalog, dir.path(), &DefineOptions::default()).unwrap_err();
    assert_eq!(err.definer_kind(), Some(DefinerErrorKind::MissingFields));
    assert!(catalog.is_empty());
}

#[test]
fn test_options_file() {
    let dir = example_folder();
    write(
        dir.path(),
        "settings/options.toml",
        r#"
primaryKey = "key"
primaryKeyFirst = true
freezeTableName = true

[fields.note]
type = "TEXT"
allowNull = true
"#,
    );

    let file = OptionsFile::from_path(dir.path().join("settings/options.toml")).unwrap();
    let options = DefineOptions::from(file).with_load_options(LoadOptions {
        recursive: false,
        ..LoadOptions::default()
    });

    let mut catalog = Catalog::new();
    define_from_folder(&mut catalog, dir.path(), &options).unwrap();

    let user = catalog.model("User2").unwrap();
    assert_eq!(user.table_name, "User2");
    assert_eq!(user.attribute_names(), ["key", "name", "note"]);
    // Subfolders are not descended into.
    assert!(!catalog.contains("options"));
}

#[test]
fn test_unknown_option_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "options.json", r#"{ "primaryKee": "id" }"#);

    let err = OptionsFile::from_path(dir.path().join("options.json")).unwrap_err();
    assert!(matches!(err, ormdb_definer::Error::Parse { .. }));
}
