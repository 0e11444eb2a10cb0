use atbang_parser::{
    extract_source, parse_properties, project, Annotation, AnnotationForm, Config,
    DiagnosticKind, Location, Properties, PropertyValue, ScalarValue, Scope,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn tags(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|t| t.to_string()).collect()
}

fn string(s: &str) -> PropertyValue {
    PropertyValue::String(s.to_string())
}

#[test]
fn literal_python_scenario() {
    let text = r#"# @!readonly true { "author": "alice" }
# @!link "https://x" { "tags": ["backend"] }
def f(): pass
"#;
    let result = extract_source("f.py", Some("python"), text);
    let target = Scope::Declaration {
        target: 3,
        text: "def f(): pass".to_string(),
    };

    let expected = vec![
        Annotation {
            key: "readonly".to_string(),
            form: AnnotationForm::Inline,
            value: Some(ScalarValue::Bool(true)),
            properties: [("author".to_string(), string("alice"))]
                .into_iter()
                .collect::<Properties>(),
            tags: BTreeSet::new(),
            location: Location::line("f.py", 1),
            scope: target.clone(),
            unclosed: false,
        },
        Annotation {
            key: "link".to_string(),
            form: AnnotationForm::Inline,
            value: Some(ScalarValue::String("https://x".to_string())),
            properties: [(
                "tags".to_string(),
                PropertyValue::Array(vec![string("backend")]),
            )]
            .into_iter()
            .collect::<Properties>(),
            tags: tags(&["backend"]),
            location: Location::line("f.py", 2),
            scope: target,
            unclosed: false,
        },
    ];

    assert_eq!(result.annotations(), expected.as_slice());
    assert!(result.diagnostics().is_empty());
}

#[test]
fn begin_end_pair_yields_one_region() {
    let text = r#"// @!begin hot "path" { "owner": "perf" }
fn a() {}
fn b() {}
// @!end hot
"#;
    let result = extract_source("lib.rs", Some("rust"), text);

    assert!(result.diagnostics().is_empty());
    let blocks: Vec<_> = result.blocks().collect();
    assert_eq!(blocks.len(), 1);
    let hot = blocks[0];
    assert_eq!(hot.key, "hot");
    assert_eq!(hot.value, Some(ScalarValue::String("path".to_string())));
    assert_eq!(hot.property("owner"), Some(&string("perf")));
    assert_eq!(hot.scope, Scope::Region { start: 1, end: 4 });
    assert_eq!((hot.location.start, hot.location.end), (1, 4));
    assert!(!hot.unclosed);
    assert_eq!(result.at_line(2).count(), 1);
    assert_eq!(result.at_line(5).count(), 0);
}

#[test]
fn same_key_nested_regions_are_independent() {
    let text = "# @!begin lock\n# @!begin lock\nx = 1\n# @!end lock\n# @!end lock\n";
    let result = extract_source("n.py", Some("python"), text);

    let regions: Vec<_> = result.blocks().map(|a| a.scope.clone()).collect();
    assert_eq!(
        regions,
        vec![
            Scope::Region { start: 1, end: 5 },
            Scope::Region { start: 2, end: 4 },
        ]
    );
    assert!(result.diagnostics().is_empty());
}

#[test]
fn end_closes_matching_key_and_leaves_others_open() {
    let text = "# @!begin outer\n# @!begin inner\nx = 1\n# @!end outer\ny = 2\n# @!end inner\n";
    let result = extract_source("m.py", Some("python"), text);

    let outer = result.by_key("outer").next().unwrap();
    let inner = result.by_key("inner").next().unwrap();
    assert_eq!(outer.scope, Scope::Region { start: 1, end: 4 });
    assert_eq!(inner.scope, Scope::Region { start: 2, end: 6 });
    assert!(result.diagnostics().is_empty());
}

#[test]
fn stacked_inline_annotations_share_target() {
    let text = "x = 1\n# @!first\n# @!second tags=[t1]\ndef g(): pass\n";
    let result = extract_source("s.py", Some("python"), text);

    let keys: Vec<_> = result.inlines().map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["first", "second"]);
    for annotation in result.inlines() {
        assert_eq!(
            annotation.scope,
            Scope::Declaration {
                target: 4,
                text: "def g(): pass".to_string()
            }
        );
    }
    assert_eq!(result.by_tag("t1").count(), 1);
}

#[test]
fn tag_union_deduplicates() {
    let text = "x = 1\n# @!k tags=[a, b] { \"tags\": [\"b\", \"c\"] }\ny = 2\n";
    let result = extract_source("t.py", Some("python"), text);

    let annotation = &result.annotations()[0];
    assert_eq!(annotation.tags, tags(&["a", "b", "c"]));
    assert_eq!(
        annotation.property("tags"),
        Some(&PropertyValue::Array(vec![
            string("a"),
            string("b"),
            string("c")
        ]))
    );
}

#[test]
fn unmatched_end_reports_and_emits_nothing() {
    let text = "x = 1\n# @!end ghost\ny = 2\n";
    let result = extract_source("u.py", Some("python"), text);

    assert_eq!(result.blocks().count(), 0);
    let kinds: Vec<_> = result.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnmatchedEnd]);
    assert_eq!(result.diagnostics()[0].location.start, 2);
}

#[test]
fn unclosed_block_is_salvaged_to_end_of_file() {
    let text = "x = 1\n# @!begin open\ny = 2\nz = 3\n";
    let result = extract_source("o.py", Some("python"), text);

    let kinds: Vec<_> = result.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnclosedBlock]);

    let blocks: Vec<_> = result.blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].scope, Scope::Region { start: 2, end: 4 });
    assert!(blocks[0].unclosed);
}

#[test]
fn properties_and_tags_round_trip() {
    let text = "x = 1\n# @!cfg tags=[z, a] { \"n\": 1.5, \"nested\": { \"ok\": [true, null] } }\ny = 2\n";
    let first = extract_source("r.py", Some("python"), text);
    let annotation = &first.annotations()[0];

    let json = serde_json::to_string(&annotation.properties).unwrap();
    let reparsed = parse_properties(&json).unwrap();
    assert_eq!(reparsed, annotation.properties);

    let again = extract_source("r.py", Some("python"), &format!("x = 1\n# @!cfg {}\ny = 2\n", json));
    let second = &again.annotations()[0];
    assert_eq!(second.properties, annotation.properties);
    assert_eq!(second.tags, annotation.tags);
}

#[test]
fn doc_block_header_is_file_level() {
    let text = "/**\n * @!owner \"core\"\n */\n\nint main() { return 0; }\n";
    let result = extract_source("main.c", Some("c"), text);

    assert_eq!(result.annotations().len(), 1);
    assert_eq!(result.annotations()[0].scope, Scope::FileLevel);
    assert_eq!(
        result.annotations()[0].value,
        Some(ScalarValue::String("core".to_string()))
    );
}

#[test]
fn trailing_annotation_is_reported() {
    let text = "x = 1\n# @!later\n";
    let result = extract_source("d.py", Some("python"), text);

    assert_eq!(result.annotations()[0].scope, Scope::Trailing);
    assert_eq!(
        result.diagnostics_of(DiagnosticKind::DanglingAnnotation).count(),
        1
    );
}

#[test]
fn project_scan_and_agent_query() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("review.py"),
        "x = 1\n# @!review { \"agent\": [\"reviewer\", \"writer\"] }\ndef h(): pass\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("notes.md"),
        "<!-- @!agent \"reviewer\" -->\n\n# Notes\n",
    )
    .unwrap();
    fs::write(
        dir.path().join(".atbang.toml"),
        "[scan]\nthreads = 1\n",
    )
    .unwrap();

    let (_, config) = Config::discover(dir.path()).unwrap().unwrap();
    let result = project::scan_path(dir.path(), &config).unwrap();

    // the config file itself is toml and gets scanned too
    assert_eq!(result.files().len(), 3);
    let keys: Vec<_> = result.by_agent("reviewer").map(|a| a.key.as_str()).collect();
    assert_eq!(keys, vec!["agent", "review"]);
    assert_eq!(result.by_agent("writer").count(), 1);
}
