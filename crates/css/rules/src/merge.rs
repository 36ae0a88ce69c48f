//! Property streams: resolving specifications and merging them.

use crate::rule::Rule;
use crate::spec::Spec;
use css_cascade::{PropertyMap, PropertyValue, merge_maps};
use log::{trace, warn};
use std::rc::Rc;
use style_stream::{Stream, StreamError};

/// Resolve `spec` into a property stream for `rule`.
///
/// Builds a fresh stream on every call. [`Spec::Derive`] is evaluated when
/// the returned stream is subscribed, once per subscription; an `Err` fails
/// that subscription only.
pub fn normalize_spec(rule: &Rule, spec: &Spec) -> Stream<PropertyMap> {
    match spec {
        Spec::Empty => Stream::constant(PropertyMap::new()),
        Spec::Properties(map) => Stream::constant(map.clone()),
        Spec::Text(text) => Stream::constant(PropertyMap::raw(
            rule.tree_config().raw_text_key(),
            PropertyValue::Text(Rc::clone(text)),
        )),
        Spec::Stream(stream) => suppress_duplicates(stream),
        Spec::Derive(derive) => {
            let rule = rule.clone();
            let derive = Rc::clone(derive);
            Stream::defer(move || {
                derive(&rule).map_or_else(
                    |error| {
                        warn!("Specification of {} failed: {error:#}", rule.selector());
                        Stream::failed(StreamError::specification(error))
                    },
                    |spec| normalize_spec(&rule, &spec),
                )
            })
        }
        Spec::Merge(base, addendum) => {
            trace!("Merging specifications of {}", rule.selector());
            merge(&normalize_spec(rule, base), &normalize_spec(rule, addendum))
        }
    }
}

/// Forward a map only when it differs from the last forwarded one.
///
/// Maps differ when a key was added or removed, or a value differs under
/// priority-aware equality.
pub fn suppress_duplicates(stream: &Stream<PropertyMap>) -> Stream<PropertyMap> {
    stream.distinct_by(PropertyMap::same_as)
}

/// Merge the latest value of `addendum` over the latest value of `base`.
///
/// Emits nothing until both sides have produced a value, then re-emits
/// whenever either side does.
pub fn merge(base: &Stream<PropertyMap>, addendum: &Stream<PropertyMap>) -> Stream<PropertyMap> {
    suppress_duplicates(&Stream::combine_latest(base, addendum, merge_maps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use style_stream::{Event, Subject, Subscription};

    type Log = Rc<RefCell<Vec<Event<PropertyMap>>>>;

    fn record(stream: &Stream<PropertyMap>) -> (Log, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::clone(&log);
        let subscription = stream.subscribe(move |event| events.borrow_mut().push(event));
        (log, subscription)
    }

    fn values(log: &Rc<RefCell<Vec<Event<PropertyMap>>>>) -> Vec<PropertyMap> {
        log.borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Next(map) => Some(map.clone()),
                Event::Failed(_) | Event::Ended(_) => None,
            })
            .collect()
    }

    #[test]
    fn identical_maps_are_forwarded_once() {
        let _ = env_logger::builder().is_test(true).try_init();
        let source = Subject::with_value(PropertyMap::from([("color", "red")]));
        let (log, _sub) = record(&suppress_duplicates(&source.stream()));
        source.set(PropertyMap::from([("color", "red")]));
        source.set(PropertyMap::from([("color", "red !important")]));
        assert_eq!(
            values(&log),
            vec![
                PropertyMap::from([("color", "red")]),
                PropertyMap::from([("color", "red !important")]),
            ]
        );
    }

    #[test]
    fn merge_waits_for_both_sides() {
        let base = Subject::with_value(PropertyMap::from([("margin", "0")]));
        let addendum = Subject::new();
        let (log, _sub) = record(&merge(&base.stream(), &addendum.stream()));
        assert!(log.borrow().is_empty());
        base.set(PropertyMap::from([("margin", "1px")]));
        assert!(log.borrow().is_empty());
        addendum.set(PropertyMap::from([("color", "blue")]));
        assert_eq!(
            values(&log),
            vec![PropertyMap::from([("margin", "1px"), ("color", "blue")])]
        );
    }

    #[test]
    fn merge_resolves_by_priority() {
        let important_last = merge(
            &Stream::constant(PropertyMap::from([("color", "red")])),
            &Stream::constant(PropertyMap::from([("color", "blue !important")])),
        );
        let (last_log, _last_sub) = record(&important_last);
        assert_eq!(values(&last_log), vec![PropertyMap::from([("color", "blue !important")])]);

        let important_first = merge(
            &Stream::constant(PropertyMap::from([("color", "red !important")])),
            &Stream::constant(PropertyMap::from([("color", "blue")])),
        );
        let (first_log, _first_sub) = record(&important_first);
        assert_eq!(values(&first_log), vec![PropertyMap::from([("color", "red !important")])]);
    }

    #[test]
    fn merge_skips_updates_that_do_not_change_the_result() {
        let base = Subject::with_value(PropertyMap::from([("color", "red")]));
        let addendum = Subject::with_value(PropertyMap::from([("color", "blue !important")]));
        let (log, _sub) = record(&merge(&base.stream(), &addendum.stream()));
        base.set(PropertyMap::from([("color", "green")]));
        addendum.set(PropertyMap::from([("color", "blue !important")]));
        assert_eq!(values(&log).len(), 1);
    }
}
