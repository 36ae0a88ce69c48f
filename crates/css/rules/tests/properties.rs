use anyhow::anyhow;
use core::cell::RefCell;
use css_rules::{PropertyMap, PropertyValue, Rule, RuleTree, Spec, TreeConfig};
use std::rc::Rc;
use style_stream::{Event, StreamError, Subject, Subscription};

type Log = Rc<RefCell<Vec<Event<PropertyMap>>>>;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn watch(rule: &Rule) -> (Log, Subscription) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let events = Rc::clone(&log);
    let subscription = rule
        .read()
        .subscribe(move |event| events.borrow_mut().push(event));
    (log, subscription)
}

fn maps(log: &Log) -> Vec<PropertyMap> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Next(map) => Some(map.clone()),
            Event::Failed(_) | Event::Ended(_) => None,
        })
        .collect()
}

fn failed(log: &Log) -> bool {
    log.borrow()
        .iter()
        .any(|event| matches!(event, Event::Failed(StreamError::Specification(_))))
}

#[test]
fn repeated_adds_accumulate() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    root.add_rule(".card", [("color", "red")]);
    let card = root.add_rule(".card", [("margin", "0")]);
    let (log, _sub) = watch(&card);

    assert_eq!(
        maps(&log),
        vec![PropertyMap::from([("color", "red"), ("margin", "0")])]
    );
}

#[test]
fn important_wins_regardless_of_order() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let later = root
        .add_rule(".later", [("color", "red")])
        .add([("color", "blue !important")]);
    let earlier = root
        .add_rule(".earlier", [("color", "red !important")])
        .add([("color", "blue")]);

    let (later_log, _later_sub) = watch(&later);
    let (earlier_log, _earlier_sub) = watch(&earlier);
    assert_eq!(
        maps(&later_log),
        vec![PropertyMap::from([("color", "blue !important")])]
    );
    assert_eq!(
        maps(&earlier_log),
        vec![PropertyMap::from([("color", "red !important")])]
    );
}

#[test]
fn numeric_and_text_values_compare_by_priority_only() {
    let tree = RuleTree::new();
    let rule = tree.root().add_rule(
        ".sized",
        PropertyMap::new().with("width", PropertyValue::Number(10.0)),
    );
    rule.add(PropertyMap::new().with("width", "20px"));
    let (log, _sub) = watch(&rule);

    assert_eq!(
        maps(&log),
        vec![PropertyMap::new().with("width", "20px")]
    );
}

#[test]
fn identical_updates_are_suppressed() {
    init();
    let source = Subject::with_value(PropertyMap::from([("color", "red")]));
    let tree = RuleTree::new();
    let rule = tree.root().add_rule(".live", source.stream());
    let (log, _sub) = watch(&rule);

    source.set(PropertyMap::from([("color", "red")]));
    assert_eq!(maps(&log).len(), 1);

    source.set(PropertyMap::from([("color", "green")]));
    assert_eq!(
        maps(&log),
        vec![
            PropertyMap::from([("color", "red")]),
            PropertyMap::from([("color", "green")]),
        ]
    );
}

#[test]
fn merged_streams_wait_for_every_side() {
    init();
    let pending = Subject::<PropertyMap>::new();
    let tree = RuleTree::new();
    let rule = tree
        .root()
        .add_rule(".late", [("margin", "0")])
        .add(pending.stream());
    let (log, _sub) = watch(&rule);
    assert!(log.borrow().is_empty());

    pending.set(PropertyMap::from([("padding", "1px")]));
    assert_eq!(
        maps(&log),
        vec![PropertyMap::from([("margin", "0"), ("padding", "1px")])]
    );
}

#[test]
fn set_replaces_instead_of_merging() {
    let tree = RuleTree::new();
    let rule = tree
        .root()
        .add_rule(".a", [("color", "red"), ("margin", "0")]);
    let (log, _sub) = watch(&rule);

    rule.set([("padding", "1px")]);

    assert_eq!(
        maps(&log).last(),
        Some(&PropertyMap::from([("padding", "1px")]))
    );
}

#[test]
fn derived_specifications_see_their_rule() {
    init();
    let tree = RuleTree::new();
    let rule = tree.root().add_rule(
        "li.item",
        Spec::derive(|rule| {
            Ok(Spec::Properties(PropertyMap::from_iter([(
                "content",
                rule.selector().to_string(),
            )])))
        }),
    );
    let (log, _sub) = watch(&rule);

    assert_eq!(
        maps(&log),
        vec![PropertyMap::from([("content", "li.item")])]
    );
}

#[test]
fn failing_specification_is_isolated() {
    init();
    let tree = RuleTree::new();
    let root = tree.root();
    let broken = root.add_rule(
        ".broken",
        Spec::derive(|_rule| Err(anyhow!("theme not loaded"))),
    );
    let sibling = root.add_rule(".fine", [("color", "red")]);

    let (broken_log, _broken_sub) = watch(&broken);
    let (sibling_log, _sibling_sub) = watch(&sibling);
    assert!(failed(&broken_log));
    assert!(maps(&broken_log).is_empty());
    assert_eq!(maps(&sibling_log), vec![PropertyMap::from([("color", "red")])]);

    broken.set([("color", "blue")]);
    let (recovered_log, _recovered_sub) = watch(&broken);
    assert!(!failed(&recovered_log));
    assert_eq!(
        maps(&recovered_log),
        vec![PropertyMap::from([("color", "blue")])]
    );
}

#[test]
fn failing_upstream_stream_is_isolated() {
    init();
    let source = Subject::with_value(PropertyMap::from([("color", "red")]));
    let tree = RuleTree::new();
    let root = tree.root();
    let live = root.add_rule(".live", source.stream());
    let sibling = root.add_rule(".fine", [("color", "red")]);
    let (live_log, _live_sub) = watch(&live);
    let (sibling_log, _sibling_sub) = watch(&sibling);

    source.fail(StreamError::upstream("feed closed"));

    assert!(matches!(
        live_log.borrow().last(),
        Some(Event::Failed(StreamError::Upstream(_)))
    ));
    assert_eq!(maps(&live_log), vec![PropertyMap::from([("color", "red")])]);

    sibling.set([("color", "blue")]);
    assert_eq!(
        maps(&sibling_log).last(),
        Some(&PropertyMap::from([("color", "blue")]))
    );

    live.set([("color", "green")]);
    let (recovered_log, _recovered_sub) = watch(&live);
    assert_eq!(
        maps(&recovered_log),
        vec![PropertyMap::from([("color", "green")])]
    );
}

#[test]
fn one_source_on_both_sides_emits_whole_updates() {
    init();
    let source = Subject::with_value(PropertyMap::from([("margin", "0")]));
    let tree = RuleTree::new();
    let rule = tree
        .root()
        .add_rule(".twice", source.stream())
        .add(source.stream());
    let (log, _sub) = watch(&rule);

    source.set(PropertyMap::from([("padding", "1px")]));

    assert_eq!(
        maps(&log),
        vec![
            PropertyMap::from([("margin", "0")]),
            PropertyMap::from([("padding", "1px")]),
        ]
    );
}

#[test]
fn text_is_stored_under_the_raw_key() {
    let tree = RuleTree::new();
    let rule = tree.root().add_rule(".raw", "color: red");
    let (log, _sub) = watch(&rule);

    assert_eq!(
        maps(&log),
        vec![PropertyMap::raw("$raw", "color: red")]
    );
}

#[test]
fn raw_key_follows_the_tree_config() {
    let tree = RuleTree::with_config(TreeConfig::new().with_raw_text_key("@text"));
    let text = Subject::with_value(Rc::<str>::from("color: red"));
    let rule = tree
        .root()
        .add_rule(".raw", Spec::text_stream(text.stream()));
    let (log, _sub) = watch(&rule);

    text.set(Rc::from("color: blue"));

    assert_eq!(
        maps(&log),
        vec![
            PropertyMap::raw("@text", "color: red"),
            PropertyMap::raw("@text", "color: blue"),
        ]
    );
}

#[test]
fn dropping_the_subscription_stops_delivery() {
    let tree = RuleTree::new();
    let rule = tree.root().add_rule(".a", [("color", "red")]);
    let (log, subscription) = watch(&rule);
    drop(subscription);

    rule.set([("color", "blue")]);

    assert_eq!(maps(&log), vec![PropertyMap::from([("color", "red")])]);
}
