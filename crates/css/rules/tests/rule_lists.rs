use core::cell::RefCell;
use css_rules::{RuleList, RuleListDelta, RuleTree, Spec};
use std::rc::Rc;
use style_stream::Subscription;

type Deltas = Rc<RefCell<Vec<RuleListDelta>>>;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn record(list: &RuleList) -> (Deltas, Subscription) {
    let deltas: Deltas = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deltas);
    let subscription = list.subscribe(move |delta| sink.borrow_mut().push(delta.clone()));
    (deltas, subscription)
}

#[test]
fn query_view_follows_matching_rules() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let first = root.add_rule("div .nested", [("color", "red")]);
    let second = root.add_rule("span > .nested", Spec::Empty);

    let view = root.rules().grab(".nested");
    assert_eq!(view.to_vec(), vec![first, second]);

    let (deltas, _sub) = record(&view);
    assert!(deltas.borrow().is_empty());

    let third = root.add_rule("p .nested.wide", Spec::Empty);
    assert_eq!(
        *deltas.borrow(),
        vec![RuleListDelta {
            added: vec![third.clone()],
            removed: Vec::new(),
        }]
    );
    assert_eq!(view.len(), 3);
    assert!(view.contains(&third));

    root.add_rule(".other", Spec::Empty);
    root.add_rule("p .nested.wide", [("margin", "0")]);
    assert_eq!(deltas.borrow().len(), 1);
}

#[test]
fn removal_is_reported_in_tree_order() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let outer = root.add_rule(".a", Spec::Empty);
    let inner = root.add_rule(".a .b", Spec::Empty);
    let kept = root.add_rule(".c", Spec::Empty);
    let view = root.rules();
    let (deltas, _sub) = record(&view);

    outer.remove(Some("unloaded"));

    assert_eq!(
        *deltas.borrow(),
        vec![RuleListDelta {
            added: Vec::new(),
            removed: vec![outer, inner],
        }]
    );
    assert_eq!(view.to_vec(), vec![kept]);
}

#[test]
fn nested_view_ignores_deeper_rules() {
    let tree = RuleTree::new();
    let root = tree.root();
    root.add_rule(".a", Spec::Empty);
    let view = root.nested();
    let (deltas, _sub) = record(&view);

    root.add_rule(".a .b", Spec::Empty);
    assert!(deltas.borrow().is_empty());

    let sibling = root.add_rule(".c", Spec::Empty);
    assert_eq!(
        *deltas.borrow(),
        vec![RuleListDelta {
            added: vec![sibling],
            removed: Vec::new(),
        }]
    );
    assert_eq!(view.len(), 2);
}

#[test]
fn views_of_other_rules_stay_put() {
    let tree = RuleTree::new();
    let root = tree.root();
    let left = root.add_rule(".left", Spec::Empty);
    let view = left.rules();
    let (deltas, _sub) = record(&view);

    root.add_rule(".right .child", Spec::Empty);
    left.add_rule(".child", Spec::Empty);

    assert_eq!(deltas.borrow().len(), 1);
    assert_eq!(view.len(), 1);
}

#[test]
fn tracking_is_lazy() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let view = root.rules().grab(".item");
    assert_eq!(tree.tracking_views(), 0);
    assert!(!view.is_tracking());

    let subscription = view.subscribe(|_delta| {});
    assert_eq!(tree.tracking_views(), 1);
    assert!(view.is_tracking());

    drop(subscription);
    assert_eq!(tree.tracking_views(), 0);
    assert!(!view.is_tracking());

    root.add_rule("li.item", Spec::Empty);
    assert!(view.is_empty());
}

#[test]
fn resubscribing_delivers_a_catch_up_delta() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let stale = root.add_rule(".stale", Spec::Empty);
    let view = root.nested();
    let first_subscription = view.subscribe(|_delta| {});
    drop(first_subscription);

    stale.remove(None);
    let fresh = root.add_rule(".fresh", Spec::Empty);
    assert_eq!(view.to_vec(), vec![stale.clone()]);

    let (deltas, _sub) = record(&view);
    assert_eq!(
        *deltas.borrow(),
        vec![RuleListDelta {
            added: vec![fresh.clone()],
            removed: vec![stale],
        }]
    );
    assert_eq!(view.to_vec(), vec![fresh]);
}

#[test]
fn observers_share_one_tracking_hook() {
    let tree = RuleTree::new();
    let root = tree.root();
    let view = root.rules();
    let (first, _first_sub) = record(&view);
    let (second, _second_sub) = record(&view);
    assert_eq!(tree.tracking_views(), 1);

    root.add_rule(".a", Spec::Empty);

    assert_eq!(first.borrow().len(), 1);
    assert_eq!(*first.borrow(), *second.borrow());
}
