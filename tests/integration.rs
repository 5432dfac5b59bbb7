//! Integration tests for muis.
//!
//! These tests exercise the public API from outside the crate: states
//! driving the style cascade, expressions recomputing incrementally, and the
//! layout turning resolved sizes into published bounds.

use std::cell::RefCell;
use std::rc::Rc;

use muis::dom::Document;
use muis::eval::{Environment, ObservableEvaluator, Value, ValueType};
use muis::expr::{BinaryOp, ExprGraph};
use muis::geometry::{Axis, Region};
use muis::layout::{SeriesSpring, SpringLayoutSolver, TensionSpring};
use muis::reactive::{ChangeEvent, Observable};
use muis::style::attribute::{CORNER_RADIUS, MAX_WIDTH, PREF_WIDTH};
use muis::style::{
    parse_state_expression, MutableStyle, State, StateEngine, StateExpression, StatefulStyle,
};
use muis::Error;
use pretty_assertions::assert_eq;

fn record<T: Clone + PartialEq + 'static>(
    observable: &Observable<T>,
) -> (Rc<RefCell<Vec<ChangeEvent<T>>>>, muis::reactive::Subscription) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let sub = observable.on_change(move |e| sink.borrow_mut().push(e.clone()));
    (log, sub)
}

// ---------------------------------------------------------------------------
// Style cascade
// ---------------------------------------------------------------------------

#[test]
fn corner_radius_follows_click_state() {
    let engine = StateEngine::new();
    let style = StatefulStyle::new(engine.clone());
    let click = StateExpression::state("click");
    style.set(&CORNER_RADIUS, click.clone(), Value::Int(100)).unwrap();
    style.set(&CORNER_RADIUS, click.not(), Value::Int(1000)).unwrap();

    let radius = style.get(&CORNER_RADIUS, true);
    assert_eq!(radius.get(), Some(Value::Float(0.0)));

    let controller = engine.add_state(State::new("click", 1)).unwrap();
    assert_eq!(radius.get(), Some(Value::Float(1000.0)));

    let (log, _sub) = record(&radius);
    controller.set(true);
    assert_eq!(radius.get(), Some(Value::Float(100.0)));
    controller.set(false);
    assert_eq!(radius.get(), Some(Value::Float(1000.0)));
    controller.toggle();
    controller.toggle();

    let values: Vec<_> = log.borrow().iter().map(|e| e.new.clone()).collect();
    assert_eq!(
        values,
        vec![
            Some(Value::Float(100.0)),
            Some(Value::Float(1000.0)),
            Some(Value::Float(100.0)),
            Some(Value::Float(1000.0)),
        ]
    );
}

#[test]
fn duplicate_state_controller_is_rejected() {
    let engine = StateEngine::new();
    let _first = engine.add_state(State::new("hover", 1)).unwrap();
    let second = engine.add_state(State::new("hover", 5));
    assert!(matches!(second, Err(Error::InvalidArgument { .. })));
    assert_eq!(engine.state("hover").unwrap().priority(), 1);
}

#[test]
fn textual_expressions_drive_rules() {
    let engine = StateEngine::new();
    let hover = engine.add_state(State::new("hover", 1)).unwrap();
    let click = engine.add_state(State::new("click", 2)).unwrap();
    let style = StatefulStyle::new(engine);
    let expression = parse_state_expression("hover and not click").unwrap();
    style.set(&CORNER_RADIUS, expression, Value::Int(8)).unwrap();

    assert_eq!(style.resolve("corner-radius"), None);
    hover.set(true);
    assert_eq!(style.resolve("corner-radius"), Some(Value::Float(8.0)));
    click.set(true);
    assert_eq!(style.resolve("corner-radius"), None);
    assert!(matches!(
        parse_state_expression("hover &"),
        Err(muis::style::ParseError::UnexpectedEof(_))
    ));
}

// ---------------------------------------------------------------------------
// Observable evaluation
// ---------------------------------------------------------------------------

#[test]
fn dependent_change_fires_parent_once_with_cause() {
    let mut graph = ExprGraph::new();
    let x = graph.variable("x");
    let two = graph.literal(2);
    let product = graph.binary(BinaryOp::Mul, x, two).unwrap();
    let graph = Rc::new(graph);

    let env = Environment::new();
    let var = env.bind("x", 5);
    let evaluator = ObservableEvaluator::new(Rc::clone(&graph));
    let result = evaluator.evaluate_observable(product, &env, None).unwrap();
    assert_eq!(result.get(), Value::Int(10));

    let (var_log, _a) = record(&var);
    let (log, _b) = record(&result);
    var.set(Value::Int(7));

    assert_eq!(log.borrow().len(), 1);
    let event = &log.borrow()[0];
    assert_eq!((event.old.clone(), event.new.clone()), (Value::Int(10), Value::Int(14)));
    assert!(event.cause.is_caused_by(&var_log.borrow()[0].cause));
}

#[test]
fn leaf_expressions_never_fire() {
    let mut graph = ExprGraph::new();
    let leaf = graph.literal(3.5);
    let evaluator = ObservableEvaluator::new(Rc::new(graph));
    let env = Environment::new();
    let observable = evaluator
        .evaluate_observable(leaf, &env, Some(ValueType::Str))
        .unwrap();
    let (log, _sub) = record(&observable);
    env.bind("unrelated", 1);
    assert_eq!(observable.get(), Value::from("3.5"));
    assert!(log.borrow().is_empty());
}

#[test]
fn element_attributes_feed_expressions() {
    let mut doc = Document::default();
    let button = doc.create_element("button").unwrap();
    let element = doc.get(button).unwrap();

    let mut graph = ExprGraph::new();
    let value = graph.variable("value");
    let suffix = graph.literal("!");
    let label = graph.binary(BinaryOp::Add, value, suffix).unwrap();
    let evaluator = ObservableEvaluator::new(Rc::new(graph));
    let text = evaluator
        .evaluate_observable(label, element.attributes(), None)
        .unwrap();
    assert_eq!(text.get(), Value::from("!"));

    element.set_attribute("value", "Save").unwrap();
    assert_eq!(text.get(), Value::from("Save!"));
    assert!(element.set_attribute("value", 3).is_err());
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn spring_construction_rejects_bad_ticks() {
    let rising = TensionSpring::build(0.0, 10.0, 5.0)
        .with(0.0, 10.0, 10.0)
        .and_then(|b| b.with(5.0, 20.0, 20.0));
    assert!(matches!(rising, Err(Error::InvalidConstraint { .. })));

    let backwards = TensionSpring::build(0.0, 10.0, 5.0)
        .with(5.0, 0.0, 0.0)
        .and_then(|b| b.with(4.0, -1.0, -1.0));
    assert!(matches!(backwards, Err(Error::InvalidConstraint { .. })));
}

#[test]
fn spring_round_trip_and_series() {
    let spring = TensionSpring::build(10.0, 50.0, 30.0).build().unwrap();
    for tension in [900.0, 250.0, 0.0, -300.0, -999.0] {
        let size = spring.get_size(tension);
        assert!((spring.get_tension(size) - tension).abs() < 1e-6);
    }
    let series = SeriesSpring::new(vec![spring.clone(), spring]).unwrap();
    assert_eq!(series.spring().pref(), 60.0);
    let sizes = series.distribute(80.0);
    assert!((sizes[0] - 40.0).abs() < 1e-6 && (sizes[1] - 40.0).abs() < 1e-6);
}

#[test]
fn solver_layout_is_bit_identical() {
    let mut solver = SpringLayoutSolver::default();
    let left = solver.add_edge("left");
    let right = solver.add_edge("right");
    let spring = |min, pref, max| TensionSpring::build(min, max, pref).build().unwrap();
    solver.connect(solver.origin(), left, spring(0.0, 10.0, 40.0)).unwrap();
    solver.connect(left, right, spring(20.0, 30.0, 90.0)).unwrap();
    solver.connect(right, solver.extent(), spring(0.0, 10.0, 40.0)).unwrap();

    let first = solver.layout(113.0).unwrap();
    let second = solver.layout(113.0).unwrap();
    for edge in [left, right] {
        assert_eq!(
            first.position(edge).map(f64::to_bits),
            second.position(edge).map(f64::to_bits)
        );
    }
    assert_eq!(first, second);
}

#[test]
fn clicking_a_button_changes_its_bounds() {
    let mut doc = Document::default();
    let row = doc.create_element("box").unwrap();
    let button = doc.create_element("button").unwrap();
    let label = doc.create_element("label").unwrap();
    doc.append_child(row, button).unwrap();
    doc.append_child(row, label).unwrap();

    let buttons = doc.tag_sheet("button").unwrap();
    let clicked = parse_state_expression("click").unwrap();
    for attribute in [&PREF_WIDTH, &MAX_WIDTH] {
        buttons.set(attribute, StateExpression::Always, Value::Int(20)).unwrap();
        buttons.set(attribute, clicked.clone(), Value::Int(60)).unwrap();
    }
    let labels = doc.tag_sheet("label").unwrap();
    labels.set(&PREF_WIDTH, StateExpression::Always, Value::Int(10)).unwrap();
    labels.set(&MAX_WIDTH, StateExpression::Always, Value::Int(10)).unwrap();

    let region = Region::new(0, 0, 200, 8);
    doc.layout(row, Axis::Horizontal, region).unwrap();
    let label_bounds = doc.get(label).unwrap().bounds().clone();
    assert_eq!(label_bounds.get(), Region::new(20, 0, 10, 8));

    let (log, _sub) = record(&label_bounds);
    doc.get(button).unwrap().state("click").unwrap().set(true);
    doc.layout(row, Axis::Horizontal, region).unwrap();
    assert_eq!(doc.get(button).unwrap().bounds().get(), Region::new(0, 0, 60, 8));
    assert_eq!(label_bounds.get(), Region::new(60, 0, 10, 8));
    assert_eq!(log.borrow().len(), 1);
}
