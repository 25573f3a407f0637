use codelink_core::config::{AmbiguityPolicy, ResolutionConfig};
use codelink_core::graph::{DependencyGraph, Edge, EdgeKind, Node};
use codelink_core::record::SourceRecord;
use codelink_core::store::{MemoryRecordStore, RecordStore};
use codelink_parser::extract::{extract, extract_or_failed};
use codelink_resolve::builder::{build_graph, build_project_graph};
use std::collections::BTreeSet;

fn records(files: &[(&str, &str)]) -> Vec<(String, SourceRecord)> {
    files
        .iter()
        .map(|(path, source)| (path.to_string(), extract(path, source).unwrap()))
        .collect()
}

fn build(files: &[(&str, &str)]) -> DependencyGraph {
    build_graph(&records(files), &ResolutionConfig::default())
}

fn edge_set(graph: &DependencyGraph) -> BTreeSet<(String, String, EdgeKind)> {
    graph
        .edges()
        .iter()
        .map(|e| (e.source.clone(), e.target.clone(), e.kind))
        .collect()
}

fn node_set(graph: &DependencyGraph) -> BTreeSet<String> {
    graph.nodes().map(|n| n.id().to_string()).collect()
}

fn edges_of_kind<'a>(graph: &'a DependencyGraph, kind: EdgeKind) -> Vec<&'a Edge> {
    graph.edges().iter().filter(|e| e.kind == kind).collect()
}

fn edge(source: &str, target: &str, kind: EdgeKind) -> (String, String, EdgeKind) {
    (source.to_string(), target.to_string(), kind)
}

#[test]
fn test_end_to_end_dotted_call_not_resolved() {
    let graph = build(&[
        ("a.py", "def helper(): pass\n"),
        ("b.py", "import a\ndef main(): a.helper()\n"),
    ]);

    let expected_nodes: BTreeSet<String> = ["a.py", "b.py", "a.py::helper", "b.py::main"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(node_set(&graph), expected_nodes);

    let expected_edges: BTreeSet<_> = [
        edge("a.py", "a.py::helper", EdgeKind::Contains),
        edge("b.py", "b.py::main", EdgeKind::Contains),
        edge("b.py", "a.py", EdgeKind::Imports),
    ]
    .into_iter()
    .collect();
    assert_eq!(edge_set(&graph), expected_edges);
    assert!(edges_of_kind(&graph, EdgeKind::Calls).is_empty());
}

#[test]
fn test_node_labels_and_lines() {
    let graph = build(&[("pkg/jobs.py", "class Job:\n    def run(self):\n        pass\n")]);
    match graph.get_node("pkg/jobs.py::Job.run").unwrap() {
        Node::Function {
            label,
            file_path,
            line,
            ..
        } => {
            assert_eq!(label, "run");
            assert_eq!(file_path, "pkg/jobs.py");
            assert_eq!(*line, 2);
        }
        Node::File { .. } => panic!("expected a function node"),
    }
    assert_eq!(graph.get_node("pkg/jobs.py").unwrap().label(), "jobs.py");
}

#[test]
fn test_every_function_has_one_contains_edge_from_its_file() {
    let graph = build(&[
        ("a.py", "def f():\n    def g():\n        pass\n"),
        ("b.py", "class C:\n    def m(self):\n        f()\n"),
    ]);

    for node in graph.nodes().filter(|n| n.is_function()) {
        let contains: Vec<&Edge> = graph
            .edges_to(node.id())
            .into_iter()
            .filter(|e| e.kind == EdgeKind::Contains)
            .collect();
        assert_eq!(contains.len(), 1, "{}", node.id());
        let Node::Function { file_path, .. } = node else {
            unreachable!()
        };
        assert_eq!(&contains[0].source, file_path);
    }
}

#[test]
fn test_function_without_calls_has_no_call_edges() {
    let graph = build(&[("a.py", "def quiet():\n    return 1\n\ndef loud():\n    quiet()\n")]);
    assert!(graph.edges_from("a.py::quiet").is_empty());
    assert!(graph.get_callees("a.py::quiet").is_empty());
    assert_eq!(graph.get_callees("a.py::loud")[0].id(), "a.py::quiet");
}

#[test]
fn test_local_call_precedence() {
    let graph = build(&[
        ("a.py", "def foo():\n    pass\n\ndef main():\n    foo()\n"),
        ("b.py", "def foo():\n    pass\n"),
    ]);

    let calls: Vec<&Edge> = graph.edges_from("a.py::main");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, "a.py::foo");
    assert_eq!(calls[0].kind, EdgeKind::Calls);
    assert!(edges_of_kind(&graph, EdgeKind::CallsAmbiguous).is_empty());
}

#[test]
fn test_unique_cross_file_call() {
    let graph = build(&[
        ("a.py", "def main():\n    helper(1)\n"),
        ("util/b.py", "def helper(x):\n    return x\n"),
    ]);
    assert!(graph.has_edge("a.py::main", "util/b.py::helper", EdgeKind::Calls));
    assert!(!graph.contains_node("a.py::helper"));
}

#[test]
fn test_ambiguity_fan_out() {
    let graph = build(&[
        ("one.py", "def run():\n    pass\n"),
        ("two.py", "def run():\n    pass\n"),
        ("three.py", "def run():\n    pass\n"),
        ("main.py", "def main():\n    run()\n"),
    ]);

    let from_main = graph.edges_from("main.py::main");
    assert_eq!(from_main.len(), 3);
    assert!(from_main.iter().all(|e| e.kind == EdgeKind::CallsAmbiguous));
    let targets: BTreeSet<&str> = from_main.iter().map(|e| e.target.as_str()).collect();
    let expected: BTreeSet<&str> = ["one.py::run", "two.py::run", "three.py::run"]
        .into_iter()
        .collect();
    assert_eq!(targets, expected);
    assert!(edges_of_kind(&graph, EdgeKind::Calls).is_empty());
    assert_eq!(graph.metadata().ambiguous_call_edges, 3);
}

#[test]
fn test_skip_policy_drops_ambiguous_calls() {
    let files = [
        ("one.py", "def run():\n    pass\n"),
        ("two.py", "def run():\n    pass\n"),
        ("main.py", "def main():\n    run()\n    solo()\n"),
        ("solo.py", "def solo():\n    pass\n"),
    ];
    let config = ResolutionConfig {
        ambiguity: AmbiguityPolicy::Skip,
        ..ResolutionConfig::default()
    };
    let graph = build_graph(&records(&files), &config);

    assert!(edges_of_kind(&graph, EdgeKind::CallsAmbiguous).is_empty());
    assert!(graph.has_edge("main.py::main", "solo.py::solo", EdgeKind::Calls));
}

#[test]
fn test_import_resolves_iff_file_exists() {
    let with_target = build(&[
        ("app.py", "import pkg.util\n"),
        ("src/pkg/util.py", "def u():\n    pass\n"),
    ]);
    assert!(with_target.has_edge("app.py", "src/pkg/util.py", EdgeKind::Imports));

    let without_target = build(&[("app.py", "import pkg.util\nimport requests\n")]);
    assert!(edges_of_kind(&without_target, EdgeKind::Imports).is_empty());
}

#[test]
fn test_import_matches_any_file_ending_with_module_path() {
    let graph = build(&[("app.py", "import pkg.util\n"), ("mypkg/util.py", "")]);
    assert!(graph.has_edge("app.py", "mypkg/util.py", EdgeKind::Imports));

    let graph = build(&[("main.py", "import a\n"), ("data.py", "x = 1\n")]);
    assert!(graph.has_edge("main.py", "data.py", EdgeKind::Imports));
}

#[test]
fn test_from_import_resolves_module_file() {
    let graph = build(&[
        ("main.py", "from pkg import util\n"),
        ("pkg/util.py", "def u():\n    pass\n"),
    ]);
    assert!(graph.has_edge("main.py", "pkg/util.py", EdgeKind::Imports));
}

#[test]
fn test_import_first_match_is_sorted_and_deterministic() {
    let forward = build(&[
        ("main.py", "import util\n"),
        ("b/util.py", ""),
        ("a/util.py", ""),
    ]);
    let imports = edges_of_kind(&forward, EdgeKind::Imports);
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].target, "a/util.py");
}

#[test]
fn test_custom_module_extension() {
    let config = ResolutionConfig {
        module_extension: "pyi".to_string(),
        ..ResolutionConfig::default()
    };
    let recs = records(&[("main.py", "import stubs\n"), ("stubs.pyi", "")]);
    let graph = build_graph(&recs, &config);
    assert!(graph.has_edge("main.py", "stubs.pyi", EdgeKind::Imports));
}

#[test]
fn test_order_independence_and_idempotence() {
    let files = [
        ("a.py", "import b\ndef f():\n    g()\n    run()\n"),
        ("b.py", "def g():\n    f()\n"),
        ("c.py", "def run():\n    pass\n"),
        ("d.py", "def run():\n    pass\n"),
    ];
    let mut recs = records(&files);
    let config = ResolutionConfig::default();
    let first = build_graph(&recs, &config);
    let again = build_graph(&recs, &config);
    recs.reverse();
    let reversed = build_graph(&recs, &config);

    assert_eq!(node_set(&first), node_set(&again));
    assert_eq!(edge_set(&first), edge_set(&again));
    assert_eq!(node_set(&first), node_set(&reversed));
    assert_eq!(edge_set(&first), edge_set(&reversed));
}

#[test]
fn test_failed_record_contributes_file_only() {
    let recs = vec![
        ("ok.py".to_string(), extract("ok.py", "def f():\n    pass\n").unwrap()),
        ("bad.py".to_string(), extract_or_failed("bad.py", "def (:\n")),
    ];
    let graph = build_graph(&recs, &ResolutionConfig::default());
    assert!(graph.contains_node("bad.py"));
    assert!(graph.edges_from("bad.py").is_empty());
    assert_eq!(graph.metadata().total_functions, 1);
}

#[test]
fn test_backslash_paths_normalized() {
    let recs = vec![(
        r"pkg\mod.py".to_string(),
        extract("pkg/mod.py", "def f():\n    pass\n").unwrap(),
    )];
    let graph = build_graph(&recs, &ResolutionConfig::default());
    assert!(graph.contains_node("pkg/mod.py"));
    assert!(graph.contains_node("pkg/mod.py::f"));
}

#[test]
fn test_roundtrip_preserves_neighbors() {
    let graph = build(&[
        ("a.py", "import b\ndef f():\n    g()\n"),
        ("b.py", "def g():\n    pass\n"),
    ]);
    let restored = DependencyGraph::from_serialized(graph.serialize());

    for node in graph.nodes() {
        let id = node.id();
        let callers = |g: &DependencyGraph| -> BTreeSet<String> {
            g.get_callers(id).iter().map(|n| n.id().to_string()).collect()
        };
        let callees = |g: &DependencyGraph| -> BTreeSet<String> {
            g.get_callees(id).iter().map(|n| n.id().to_string()).collect()
        };
        assert_eq!(callers(&graph), callers(&restored));
        assert_eq!(callees(&graph), callees(&restored));
    }
}

#[test]
fn test_build_project_graph_from_store() {
    let store = MemoryRecordStore::new();
    for (path, record) in records(&[("a.py", "def f():\n    pass\n")]) {
        store.store("demo", &path, &record).unwrap();
    }

    let graph = build_project_graph(&store, "demo", &ResolutionConfig::default()).unwrap();
    assert_eq!(graph.node_count(), 2);

    let empty = build_project_graph(&store, "unknown", &ResolutionConfig::default()).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.edge_count(), 0);
}
