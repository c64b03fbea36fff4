use crate::integration::support::TestStore;
use sqlfs::config::SqlFsConfig;
use sqlfs::tooling::cli::{CliContext, Commands};
use sqlfs::FsError;

fn context(store: &TestStore) -> CliContext {
    CliContext::new(&store.path(), SqlFsConfig::default()).unwrap()
}

#[test]
fn init_reports_creation_then_reuse() {
    let store = TestStore::new();
    let output = context(&store).execute(&Commands::Init).unwrap();
    assert!(output.starts_with("Initialized store"));
    assert!(output.contains("fsLabel"));
    assert!(output.contains("SQLFS"));

    let output = context(&store).execute(&Commands::Init).unwrap();
    assert!(output.contains("already initialized"));
}

#[test]
fn mkdir_write_cat_roundtrip() {
    let store = TestStore::new();
    let cli = context(&store);
    cli.execute(&Commands::Mkdir {
        path: "/docs/notes".to_string(),
        parents: true,
    })
    .unwrap();
    cli.execute(&Commands::Write {
        path: "/docs/notes/today.txt".to_string(),
        text: Some("remember".to_string()),
        from: None,
    })
    .unwrap();

    let body = cli
        .execute(&Commands::Cat {
            path: "/docs/notes/today.txt".to_string(),
        })
        .unwrap();
    assert_eq!(body, "remember");
}

#[test]
fn mkdir_without_parents_needs_existing_parent() {
    let store = TestStore::new();
    let cli = context(&store);
    let err = cli
        .execute(&Commands::Mkdir {
            path: "/missing/child".to_string(),
            parents: false,
        })
        .unwrap_err();
    assert!(matches!(err, FsError::ChildNotFound(_)));
}

#[test]
fn ls_json_lists_children_in_creation_order() {
    let store = TestStore::new();
    let cli = context(&store);
    for path in ["/b", "/a"] {
        cli.execute(&Commands::Mkdir {
            path: path.to_string(),
            parents: false,
        })
        .unwrap();
    }
    cli.execute(&Commands::Touch {
        path: "/c.txt".to_string(),
    })
    .unwrap();

    let output = cli
        .execute(&Commands::Ls {
            path: "/".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let entries = parsed.as_array().unwrap();
    let names: Vec<&str> = entries
        .iter()
        .map(|e| e.get("name").and_then(|n| n.as_str()).unwrap())
        .collect();
    assert_eq!(names, vec!["b", "a", "c.txt"]);
    assert_eq!(entries[2].get("kind").and_then(|k| k.as_str()), Some("file"));
}

#[test]
fn mv_rename_rm_flow() {
    let store = TestStore::new();
    let cli = context(&store);
    cli.execute(&Commands::Mkdir {
        path: "/src".to_string(),
        parents: false,
    })
    .unwrap();
    cli.execute(&Commands::Mkdir {
        path: "/dst".to_string(),
        parents: false,
    })
    .unwrap();
    cli.execute(&Commands::Touch {
        path: "/src/f".to_string(),
    })
    .unwrap();

    cli.execute(&Commands::Mv {
        src: "/src/f".to_string(),
        dest: "/dst".to_string(),
    })
    .unwrap();
    cli.execute(&Commands::Rename {
        path: "/dst/f".to_string(),
        new_name: "g".to_string(),
    })
    .unwrap();
    assert!(cli.fs().exists("/dst/g").unwrap());
    assert!(!cli.fs().exists("/src/f").unwrap());

    let output = cli
        .execute(&Commands::Rm {
            path: "/dst".to_string(),
        })
        .unwrap();
    assert!(output.contains("directory"));
    assert!(!cli.fs().exists("/dst/g").unwrap());
}

#[test]
fn stat_json_has_metadata_fields() {
    let store = TestStore::new();
    let cli = context(&store);
    cli.execute(&Commands::Write {
        path: "/data.bin".to_string(),
        text: Some("abc".to_string()),
        from: None,
    })
    .unwrap();

    let output = cli
        .execute(&Commands::Stat {
            path: "/data.bin".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("size").and_then(|v| v.as_u64()), Some(6));
    assert_eq!(parsed.get("parent").and_then(|v| v.as_i64()), Some(1));
    assert!(parsed.get("created").and_then(|v| v.as_str()).is_some());
}

#[test]
fn write_from_host_file_stores_bytes() {
    let store = TestStore::new();
    let host = store.dir.path().join("host.bin");
    std::fs::write(&host, [0u8, 159, 146, 150]).unwrap();
    let cli = context(&store);
    let output = cli
        .execute(&Commands::Write {
            path: "/copy.bin".to_string(),
            text: None,
            from: Some(host),
        })
        .unwrap();
    assert!(output.contains("Wrote 4 bytes"));
}

#[test]
fn info_and_tree_render() {
    let store = TestStore::new();
    let cli = context(&store);
    cli.execute(&Commands::SetInfo {
        name: "owner".to_string(),
        value: "ops".to_string(),
    })
    .unwrap();
    let value = cli
        .execute(&Commands::Info {
            name: Some("owner".to_string()),
        })
        .unwrap();
    assert_eq!(value, "ops");

    cli.execute(&Commands::Mkdir {
        path: "/x/y".to_string(),
        parents: true,
    })
    .unwrap();
    let tree = cli
        .execute(&Commands::Tree {
            path: "/".to_string(),
        })
        .unwrap();
    assert!(tree.contains('x'));
    assert!(tree.contains('y'));
}
