use geo::{polygon, Area, BooleanOps, MultiPolygon, Polygon};

use overlap_resolver::{
    run, FeatureInput, FeatureKey, LayerInput, OverlapScope, ResolutionPolicy, ResolverConfig, RunContext,
    RunStatus, Value,
};

fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
    geo::polygon![
        (x: x0, y: y0),
        (x: x0 + size, y: y0),
        (x: x0 + size, y: y0 + size),
        (x: x0, y: y0 + size),
    ]
}

fn resolved(status: RunStatus) -> overlap_resolver::OutputCollection {
    match status {
        RunStatus::Resolved(output) => output,
        other => panic!("expected a resolved run, got {}", other.name()),
    }
}

fn all_overlaps() -> ResolverConfig {
    ResolverConfig {
        overlap_scope: OverlapScope::AllOverlaps,
        ..ResolverConfig::default()
    }
}

#[test]
fn subdivision_keeps_inner_feature_and_trims_outer() {
    let layers = vec![
        LayerInput::new("legacy", "EPSG:2193")
            .fields(["parcel"])
            .feature(FeatureInput::new(1, square(0.0, 0.0, 10.0), vec![Value::from("Lot 1 DP 1000")])),
        LayerInput::new("current", "EPSG:2193")
            .fields(["parcel"])
            .feature(FeatureInput::new(1, square(3.0, 3.0, 2.0), vec![Value::from("Lot 7 DP 5000")])),
    ];
    let policy = ResolutionPolicy::priority([("current", 1), ("legacy", 2)]).unwrap();

    let output = resolved(run(ResolverConfig::default(), policy, layers, &RunContext::default()));
    assert_eq!(output.crs, "EPSG:2193");
    assert_eq!(output.len(), 2);

    let inner = output.get(&FeatureKey::new("current", 1)).unwrap();
    assert!(!inner.trimmed);
    assert_eq!(inner.geometry, MultiPolygon::new(vec![square(3.0, 3.0, 2.0)]));

    let outer = output.get(&FeatureKey::new("legacy", 1)).unwrap();
    assert!(outer.trimmed);
    assert!((outer.geometry.unsigned_area() - 96.0).abs() < 1e-9);
    assert!(outer.geometry.intersection(&inner.geometry).unsigned_area() < 1e-9);
}

#[test]
fn subdivision_only_scope_leaves_partial_overlaps_alone() {
    let layers = vec![
        LayerInput::new("a", "X").feature(FeatureInput::new(1, square(0.0, 0.0, 4.0), vec![])),
        LayerInput::new("b", "X").feature(FeatureInput::new(1, square(2.0, 2.0, 4.0), vec![])),
    ];
    let policy = ResolutionPolicy::priority([("a", 1)]).unwrap();

    let output = resolved(run(ResolverConfig::default(), policy, layers, &RunContext::default()));
    assert_eq!(output.report.untouched, 2);
    assert_eq!(output.report.trimmed, 0);
}

#[test]
fn surviving_features_of_different_layers_do_not_overlap() {
    let layers = vec![
        LayerInput::new("a", "X").feature(FeatureInput::new(1, square(0.0, 0.0, 4.0), vec![])),
        LayerInput::new("b", "X").feature(FeatureInput::new(1, square(2.0, 2.0, 4.0), vec![])),
        LayerInput::new("c", "X")
            .feature(FeatureInput::new(1, square(1.0, 1.0, 4.0), vec![]))
            .feature(FeatureInput::new(2, square(10.0, 10.0, 2.0), vec![])),
    ];
    let policy = ResolutionPolicy::priority([("a", 1), ("b", 2)]).unwrap();

    let output = resolved(run(all_overlaps(), policy, layers, &RunContext::default()));
    assert_eq!(output.len(), 4);
    assert_eq!(output.report.trimmed, 2);
    assert_eq!(output.report.untouched, 2);

    for (i, f) in output.features.iter().enumerate() {
        for g in &output.features[i + 1..] {
            if f.key.layer != g.key.layer {
                let shared = f.geometry.intersection(&g.geometry).unsigned_area();
                assert!(shared < 1e-9, "{} and {} still share {shared}", f.key, g.key);
            }
        }
    }
}

#[test]
fn resolving_own_output_again_changes_nothing() {
    let layers = vec![
        LayerInput::new("a", "X").feature(FeatureInput::new(1, square(0.0, 0.0, 4.0), vec![])),
        LayerInput::new("b", "X")
            .feature(FeatureInput::new(1, square(2.0, 2.0, 4.0), vec![]))
            .feature(FeatureInput::new(2, square(1.0, 1.0, 1.0), vec![])),
    ];
    let policy = ResolutionPolicy::priority([("a", 1), ("b", 2)]).unwrap();

    let first = resolved(run(all_overlaps(), policy.clone(), layers, &RunContext::default()));
    assert_eq!(first.report.dropped, 1);

    let again = first.clone().into_layers();
    assert_eq!(again.len(), 2);
    assert_eq!(again[1].features.len(), 1);

    let status = run(all_overlaps(), policy, again, &RunContext::default());
    assert!(matches!(status, RunStatus::NoOverlaps), "got {}", status.name());
}

#[test]
fn attribute_rows_survive_unchanged() {
    let rows = vec![
        vec![Value::from("Lot 2"), Value::from(42), Value::from(0.25), Value::Null, Value::from(true)],
        vec![Value::from("Lot 3"), Value::from(-1), Value::from(1e9), Value::from(""), Value::from(false)],
    ];
    let fields = ["name", "code", "ratio", "note", "active"];
    let layers = vec![
        LayerInput::new("outer", "X")
            .fields(fields)
            .feature(FeatureInput::new(5, square(0.0, 0.0, 10.0), rows[0].clone())),
        LayerInput::new("inner", "X")
            .fields(fields)
            .feature(FeatureInput::new(6, square(1.0, 1.0, 1.0), rows[1].clone())),
    ];
    let policy = ResolutionPolicy::priority([("inner", 0)]).unwrap();

    let output = resolved(run(ResolverConfig::default(), policy, layers, &RunContext::default()));
    assert_eq!(output.get(&FeatureKey::new("outer", 5)).unwrap().attributes, rows[0]);
    assert_eq!(output.get(&FeatureKey::new("inner", 6)).unwrap().attributes, rows[1]);
    assert_eq!(output.schemas[0].fields.len(), 5);
}

#[test]
fn disjoint_layers_report_no_overlaps() {
    let layers = vec![
        LayerInput::new("a", "X").feature(FeatureInput::new(1, square(0.0, 0.0, 1.0), vec![])),
        // Shares only an edge.
        LayerInput::new("b", "X").feature(FeatureInput::new(1, square(1.0, 0.0, 1.0), vec![])),
    ];
    let status = run(
        ResolverConfig::default(),
        ResolutionPolicy::temporal(),
        layers,
        &RunContext::default(),
    );
    assert!(matches!(status, RunStatus::NoOverlaps));
}

#[test]
fn precondition_violations_fail_before_running() {
    let status = run(
        ResolverConfig::default(),
        ResolutionPolicy::temporal(),
        Vec::new(),
        &RunContext::default(),
    );
    assert!(matches!(status, RunStatus::Failed(ref e) if e.is_validation()));

    let layers = vec![
        LayerInput::new("a", "EPSG:4326"),
        LayerInput::new("b", "EPSG:2193"),
    ];
    let status = run(ResolverConfig::default(), ResolutionPolicy::temporal(), layers, &RunContext::default());
    match status {
        RunStatus::Failed(e) => assert!(e.to_string().contains("EPSG:2193")),
        other => panic!("expected failure, got {}", other.name()),
    }
}

#[test]
fn config_and_policy_load_from_json() {
    let config = ResolverConfig::from_json_str(r#"{"overlap_scope":"all_overlaps","parallel_detection":false}"#).unwrap();
    let policy = ResolutionPolicy::from_json_str(r#"{"type":"priority","ranks":{"a":1,"b":2}}"#).unwrap();
    let layers = vec![
        LayerInput::new("a", "X").feature(FeatureInput::new(1, square(0.0, 0.0, 4.0), vec![])),
        LayerInput::new("b", "X").feature(FeatureInput::new(1, square(2.0, 0.0, 4.0), vec![])),
    ];

    let output = resolved(run(config, policy, layers, &RunContext::default()));
    let b = output.get(&FeatureKey::new("b", 1)).unwrap();
    assert!((b.geometry.unsigned_area() - 8.0).abs() < 1e-9);
}
