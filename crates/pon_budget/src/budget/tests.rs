use super::*;
use crate::config::SignalThresholds;
use crate::network::{create_source, LengthUnit, ROOT_NODE_ID};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn node(id: &str, own_loss_db: f64, component: Component) -> Node {
    Node::new(NodeId::from(id), id, own_loss_db, component)
}

fn terminal(id: &str) -> Node {
    node(id, 0.0, Component::Terminal)
}

fn span_km(id: &str, km: f64) -> Node {
    node(
        id,
        km * 0.35,
        Component::FiberSpan {
            length_value: km,
            length_unit: LengthUnit::Kilometers,
            attenuation_db_per_km: Some(0.35),
        },
    )
}

fn balanced(id: &str, ratio: &str, loss: f64) -> Node {
    node(
        id,
        loss,
        Component::BalancedSplitter {
            split_ratio: ratio.to_string(),
        },
    )
}

fn unbalanced(id: &str, ratio: &str, drop: Option<f64>, pass: Option<f64>) -> Node {
    node(
        id,
        0.0,
        Component::UnbalancedSplitter {
            split_ratio: ratio.to_string(),
            drop_loss_override_db: drop,
            pass_loss_override_db: pass,
        },
    )
}

fn power_out(tree: &AnnotatedNode, id: &str) -> f64 {
    tree.find(&NodeId::from(id))
        .map(|node| node.power_out_dbm)
        .unwrap_or(f64::NAN)
}

fn defaults() -> LossDefaults {
    LossDefaults::default()
}

#[test]
fn fiber_splitter_terminal_chain() {
    let mut splitter = balanced("S", "1:8", 10.5);
    splitter.branches[0].push(terminal("T"));
    let mut root = create_source("OLT");
    root.branches[0] = vec![span_km("F", 1.0), splitter];

    let annotated = evaluate(&root, 5.0, &defaults());
    assert_close(annotated.power_in_dbm, 5.0);
    assert_close(annotated.power_out_dbm, 5.0);
    assert_close(power_out(&annotated, "F"), 4.65);
    assert_close(power_out(&annotated, "S"), -5.85);
    assert_close(power_out(&annotated, "T"), -5.85);
    let splitter = annotated.find(&NodeId::from("S")).unwrap();
    assert_close(splitter.power_in_dbm, 4.65);
    assert_close(splitter.loss_db(), 10.5);
}

#[test]
fn balanced_ports_all_receive_the_same_power() {
    let mut splitter = balanced("S", "1:4", 7.2);
    for (index, branch) in splitter.branches.iter_mut().enumerate() {
        branch.push(terminal(&format!("T{index}")));
    }
    let mut root = create_source("OLT");
    root.branches[0].push(splitter);

    let annotated = evaluate(&root, 3.0, &defaults());
    for index in 0..4 {
        let reading = annotated.find(&NodeId::from(format!("T{index}").as_str())).unwrap();
        assert_close(reading.power_in_dbm, -4.2);
    }
}

#[test]
fn unbalanced_legs_use_table_losses() {
    let mut tap = unbalanced("U", "10/90", Some(11.0), Some(1.1));
    tap.branches[0].push(terminal("D"));
    tap.branches[1].push(terminal("P"));
    let mut root = create_source("OLT");
    root.branches[0].push(tap);

    let annotated = evaluate(&root, 5.0, &defaults());
    assert_close(power_out(&annotated, "D"), -6.0);
    assert_close(power_out(&annotated, "P"), 3.9);
    assert_close(power_out(&annotated, "U"), 5.0);
}

#[test]
fn unbalanced_own_loss_applies_to_both_legs() {
    let mut tap = unbalanced("U", "50/50", None, None);
    tap.own_loss_db = 0.5;
    tap.branches[0].push(terminal("D"));
    tap.branches[1].push(terminal("P"));
    let mut root = create_source("OLT");
    root.branches[0].push(tap);

    let annotated = evaluate(&root, 0.0, &defaults());
    assert_close(power_out(&annotated, "D"), -4.2);
    assert_close(power_out(&annotated, "P"), -4.2);
}

#[test]
fn unbalanced_override_beats_table() {
    let mut tap = unbalanced("U", "20/80", Some(9.0), None);
    tap.branches[0].push(terminal("D"));
    tap.branches[1].push(terminal("P"));
    let mut root = create_source("OLT");
    root.branches[0].push(tap);

    let annotated = evaluate(&root, 0.0, &defaults());
    assert_close(power_out(&annotated, "D"), -9.0);
    assert_close(power_out(&annotated, "P"), -1.6);
}

#[test]
fn unknown_unbalanced_ratio_loses_nothing_per_leg() {
    let mut tap = unbalanced("U", "15/85", None, None);
    tap.branches[1].push(terminal("P"));
    let mut root = create_source("OLT");
    root.branches[0].push(tap);

    let annotated = evaluate(&root, 2.0, &defaults());
    assert_close(power_out(&annotated, "P"), 2.0);
}

#[test]
fn fiber_loss_ignores_stale_stored_value() {
    let mut span = span_km("F", 2.0);
    span.own_loss_db = 50.0;
    let mut root = create_source("OLT");
    root.branches[0].push(span);

    let annotated = evaluate(&root, 0.0, &defaults());
    assert_close(power_out(&annotated, "F"), -0.7);
}

#[test]
fn fiber_without_attenuation_uses_configured_default() {
    let span = node(
        "F",
        0.0,
        Component::FiberSpan {
            length_value: 1000.0,
            length_unit: LengthUnit::Meters,
            attenuation_db_per_km: None,
        },
    );
    let mut root = create_source("OLT");
    root.branches[0].push(span);
    let mut defaults = defaults();
    defaults.fiber_attenuation_db_per_km = 0.4;

    let annotated = evaluate(&root, 0.0, &defaults);
    assert_close(power_out(&annotated, "F"), -0.4);
}

#[test]
fn losses_chain_along_a_branch() {
    let mut root = create_source("OLT");
    root.branches[0] = vec![
        node("C1", 0.25, Component::Connector),
        node("SP", 0.05, Component::Splice),
        node("C2", 0.25, Component::Connector),
        node("T", 0.2, Component::Terminal),
    ];

    let annotated = evaluate(&root, 1.0, &defaults());
    assert_close(power_out(&annotated, "C1"), 0.75);
    assert_close(power_out(&annotated, "SP"), 0.7);
    assert_close(power_out(&annotated, "C2"), 0.45);
    let reading = annotated.find(&NodeId::from("T")).unwrap();
    assert_close(reading.power_in_dbm, 0.45);
    assert_close(reading.power_out_dbm, 0.25);
}

#[test]
fn evaluation_is_repeatable_and_leaves_input_alone() {
    let mut splitter = balanced("S", "1:2", 3.5);
    splitter.branches[1].push(terminal("T"));
    let mut root = create_source("OLT");
    root.branches[0] = vec![span_km("F", 3.0), splitter];
    let before = root.clone();

    let first = evaluate(&root, 4.0, &defaults());
    let second = evaluate(&root, 4.0, &defaults());
    assert_eq!(first, second);
    assert_eq!(root, before);
}

#[test]
fn evaluation_can_start_below_the_root() {
    let mut splitter = balanced("S", "1:2", 3.5);
    splitter.branches[0].push(terminal("T"));
    let annotated = evaluate(&splitter, -1.0, &defaults());
    assert_close(annotated.power_out_dbm, -4.5);
    assert_close(power_out(&annotated, "T"), -4.5);
}

#[test]
fn terminal_paths_name_splitter_ports() {
    let mut inner = balanced("S", "1:4", 7.2);
    inner.branches[2].push(terminal("T1"));
    let mut tap = unbalanced("U", "10/90", Some(11.0), Some(1.1));
    tap.branches[0].push(terminal("T0"));
    tap.branches[1] = vec![span_km("F", 1.0), inner];
    let mut root = create_source("OLT");
    root.branches[0] = vec![tap, terminal("T2")];

    let readings = collect_terminals(&evaluate(&root, 5.0, &defaults()));
    let summary: Vec<(&str, &str)> = readings
        .iter()
        .map(|reading| (reading.id.as_str(), reading.path.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("T0", "Drop"), ("T1", "Pass > P3"), ("T2", MAIN_LINE_PATH)]
    );
    assert_close(readings[1].power_out_dbm, 5.0 - 1.1 - 0.35 - 7.2);
    assert_eq!(readings[0].name, "T0");
}

#[test]
fn branch_labels_by_kind() {
    assert_eq!(branch_label(NodeKind::BalancedSplitter, 0), Some("P1".to_string()));
    assert_eq!(branch_label(NodeKind::BalancedSplitter, 7), Some("P8".to_string()));
    assert_eq!(branch_label(NodeKind::UnbalancedSplitter, 0), Some("Drop".to_string()));
    assert_eq!(branch_label(NodeKind::UnbalancedSplitter, 1), Some("Pass".to_string()));
    assert_eq!(branch_label(NodeKind::Source, 0), None);
}

#[test]
fn no_terminals_means_no_readings() {
    let mut root = create_source("OLT");
    root.branches[0].push(span_km("F", 1.0));
    let readings = collect_terminals(&evaluate(&root, 0.0, &defaults()));
    assert!(readings.is_empty());
    assert!(worst_terminal(&readings).is_none());
}

#[test]
fn loss_summary_groups_by_kind() {
    let mut tap = unbalanced("U", "10/90", Some(11.0), Some(1.1));
    tap.own_loss_db = 0.2;
    let mut splitter = balanced("S", "1:2", 3.5);
    splitter.branches[0].push(node("C2", 0.25, Component::Connector));
    let mut root = create_source("OLT");
    root.branches[0] = vec![
        span_km("F1", 1.0),
        node("C1", 0.25, Component::Connector),
        span_km("F2", 2.0),
        splitter,
        tap,
        node("T", 0.3, Component::Terminal),
    ];

    let summary = summarize_loss_by_kind(&evaluate(&root, 0.0, &defaults()));
    assert_close(summary[&NodeKind::FiberSpan], 1.05);
    assert_close(summary[&NodeKind::Connector], 0.5);
    assert_close(summary[&NodeKind::BalancedSplitter], 3.5);
    assert_close(summary[&NodeKind::UnbalancedSplitter], 0.2);
    assert!(!summary.contains_key(&NodeKind::Terminal));
    assert!(!summary.contains_key(&NodeKind::Source));
    assert_close(total_loss_db(&summary), 5.25);
}

#[test]
fn worst_terminal_prefers_earliest_on_tie() {
    let reading = |id: &str, power_out_dbm: f64| TerminalReading {
        id: NodeId::from(id),
        name: id.to_string(),
        power_out_dbm,
        path: MAIN_LINE_PATH.to_string(),
    };
    let readings = vec![
        reading("A", -12.0),
        reading("B", -20.0),
        reading("C", -20.0),
        reading("D", -3.0),
    ];
    assert_eq!(worst_terminal(&readings).map(|r| r.id.as_str()), Some("B"));
}

#[test]
fn signal_grades_follow_thresholds() {
    let thresholds = SignalThresholds::default();
    assert_eq!(SignalGrade::classify(-10.0, &thresholds), SignalGrade::Good);
    assert_eq!(SignalGrade::classify(-25.0, &thresholds), SignalGrade::Good);
    assert_eq!(SignalGrade::classify(-25.1, &thresholds), SignalGrade::Marginal);
    assert_eq!(SignalGrade::classify(-28.0, &thresholds), SignalGrade::Marginal);
    assert_eq!(SignalGrade::classify(-28.5, &thresholds), SignalGrade::Critical);
    assert_eq!(SignalGrade::Critical.label(), "critical");

    let reading = TerminalReading {
        id: NodeId::from(ROOT_NODE_ID),
        name: "T".to_string(),
        power_out_dbm: -26.0,
        path: "P1".to_string(),
    };
    assert_eq!(reading.grade(&thresholds), SignalGrade::Marginal);
}

#[test]
fn annotated_tree_serializes_power_levels() {
    let mut root = create_source("OLT");
    root.branches[0].push(terminal("T"));
    let value = serde_json::to_value(evaluate(&root, 1.5, &defaults())).unwrap();
    assert_eq!(value["kind"], "source");
    assert_eq!(value["power_out_dbm"], 1.5);
    assert_eq!(value["branches"][0][0]["power_in_dbm"], 1.5);
}
