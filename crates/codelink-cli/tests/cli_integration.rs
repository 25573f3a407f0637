//! Integration tests for codelink-cli functionality.
//! Tests the underlying library functions that the CLI commands invoke.

use codelink_core::config::CodelinkConfig;
use codelink_core::graph::EdgeKind;
use codelink_core::storage;
use codelink_core::store::JsonRecordStore;
use std::fs;
use std::path::Path;

fn write_project(root: &Path) {
    fs::write(root.join("a.py"), "def helper():\n    pass\n").unwrap();
    fs::write(
        root.join("b.py"),
        "import a\nfrom a import helper\n\ndef main():\n    helper()\n    a.helper()\n",
    )
    .unwrap();
}

#[test]
fn test_parse_graph_info_flow() {
    let tmpdir = tempfile::tempdir().unwrap();
    let root = tmpdir.path();
    write_project(root);

    let config = CodelinkConfig::load(root).unwrap();
    let store = JsonRecordStore::new(config.storage.records_root(root));

    let summary =
        codelink_parser::parse_project(root, "demo", &store, &config.extraction).unwrap();
    assert_eq!(summary.parsed_files, 2);
    assert!(root.join(".codelink/records/demo/b.py.json").exists());

    let graph = codelink_resolve::build_project_graph(&store, "demo", &config.resolution).unwrap();
    storage::save_graph(root, "demo", &graph).unwrap();
    assert!(storage::graph_exists(root, "demo"));
    assert!(root.join(".codelink/graphs/demo.json").exists());

    let loaded = storage::load_graph(root, "demo").unwrap();
    assert_eq!(loaded.metadata().total_files, 2);
    assert_eq!(loaded.metadata().total_functions, 2);
    assert!(loaded.has_edge("b.py", "a.py", EdgeKind::Imports));
    assert!(loaded.has_edge("b.py::main", "a.py::helper", EdgeKind::Calls));

    let hood = loaded.neighborhood("a.py::helper").unwrap();
    let callers: Vec<&str> = hood.callers.iter().map(|n| n.id()).collect();
    assert_eq!(callers, vec!["a.py", "b.py::main"]);
}

#[test]
fn test_record_lookup_relative_and_absolute() {
    let tmpdir = tempfile::tempdir().unwrap();
    let root = tmpdir.path();
    write_project(root);

    let config = CodelinkConfig::default();
    let store = JsonRecordStore::new(config.storage.records_root(root));
    codelink_parser::parse_project(root, "demo", &store, &config.extraction).unwrap();

    let record = codelink_parser::get_file_record(&store, "demo", root, "b.py")
        .unwrap()
        .unwrap();
    assert_eq!(record.imports.len(), 2);
    assert_eq!(record.imports[1].module, "a.helper");

    let abs = root.join("b.py");
    let same = codelink_parser::get_file_record(&store, "demo", root, &abs.to_string_lossy())
        .unwrap()
        .unwrap();
    assert_eq!(record, same);
}

#[test]
fn test_config_file_changes_records_dir_and_policy() {
    let tmpdir = tempfile::tempdir().unwrap();
    let root = tmpdir.path();
    write_project(root);
    fs::write(root.join("c.py"), "def helper():\n    pass\n").unwrap();
    fs::create_dir_all(root.join(".codelink")).unwrap();
    fs::write(
        root.join(".codelink/config.toml"),
        "[resolution]\nambiguity = \"skip\"\n\n[storage]\nrecords_dir = \"meta\"\n",
    )
    .unwrap();

    let config = CodelinkConfig::load(root).unwrap();
    let store = JsonRecordStore::new(config.storage.records_root(root));
    codelink_parser::parse_project(root, "demo", &store, &config.extraction).unwrap();
    assert!(root.join("meta/demo/a.py.json").exists());

    let graph = codelink_resolve::build_project_graph(&store, "demo", &config.resolution).unwrap();
    assert!(graph.edges_from("b.py::main").is_empty());
}

#[test]
fn test_graph_missing_before_build() {
    let tmpdir = tempfile::tempdir().unwrap();
    assert!(!storage::graph_exists(tmpdir.path(), "demo"));
    assert!(storage::load_graph(tmpdir.path(), "demo").is_err());
}
