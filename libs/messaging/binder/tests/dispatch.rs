//! Dispatch resolution tests
//!
//! Pattern matching, ordering across the type chain, binding lifecycle,
//! owner detach and concurrent resolution.

use binder::{Binder, BinderError, BindingScope, Handler, HandlerId};
use codec::{Cell, Event};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

codec::message! {
    pub struct Quote: 500 {
        foo: i32,
        venue: String,
    }
}

codec::message! {
    pub struct TimedQuote: 501 extends Quote {
        ts: u64,
    }
}

codec::message! {
    pub struct Probe: 510 {
        a: u8,
        b: u8,
        c: u8,
    }
}

fn quote_with_foo(foo: i32) -> Quote {
    Quote::new().with_foo(foo)
}

#[test]
fn test_unconstrained_precedes_constrained() {
    let binder = Binder::new();
    let h1 = binder.bind_fn(&Quote::new(), |_| {});
    let h2 = binder.bind_fn(&quote_with_foo(1), |_| {});

    let chain = binder.build_handler_chain(&quote_with_foo(1));
    assert_eq!(chain.ids(), vec![h1.handler(), h2.handler()]);

    let chain = binder.build_handler_chain(&quote_with_foo(2));
    assert_eq!(chain.ids(), vec![h1.handler()]);
}

#[test]
fn test_untouched_field_in_message_fails_constraint() {
    let binder = Binder::new();
    binder.bind_fn(&quote_with_foo(0), |_| {});
    // foo holds the default 0 but was never assigned
    assert!(binder.build_handler_chain(&Quote::new()).is_empty());
}

#[test]
fn test_unbind_twice_is_noop() {
    let binder = Binder::new();
    let keep = binder.bind_fn(&Quote::new(), |_| {});
    let token = binder.bind_fn(&quote_with_foo(1), |_| {});

    assert!(binder.unbind(&token));
    assert!(!binder.unbind(&token));
    assert_eq!(
        binder.build_handler_chain(&quote_with_foo(1)).ids(),
        vec![keep.handler()]
    );
    assert_eq!(binder.binding_count(), 1);
}

#[test]
fn test_handlers_sharing_a_pattern_keep_bind_order() {
    let binder = Binder::new();
    let pattern = quote_with_foo(3);
    let first = binder.bind_fn(&pattern, |_| {});
    let second = binder.bind_fn(&pattern, |_| {});
    assert_eq!(binder.slot_count(Quote::TAG.id()), 1);

    assert_eq!(
        binder.build_handler_chain(&quote_with_foo(3)).ids(),
        vec![first.handler(), second.handler()]
    );

    // Dropping one handler keeps the entry alive for the other
    binder.unbind(&first);
    assert_eq!(
        binder.build_handler_chain(&quote_with_foo(3)).ids(),
        vec![second.handler()]
    );
    assert_eq!(binder.slot_count(Quote::TAG.id()), 1);
}

#[test]
fn test_derived_handlers_precede_base_handlers() {
    let binder = Binder::new();
    let on_event = binder.bind_fn(&Event::new(), |_| {});
    let on_quote = binder.bind_fn(&Quote::new(), |_| {});
    let on_timed = binder.bind_fn(&TimedQuote::new(), |_| {});

    let mut timed = TimedQuote::new().with_ts(10);
    timed.set_foo(1);
    assert_eq!(
        binder.build_handler_chain(&timed).ids(),
        vec![on_timed.handler(), on_quote.handler()]
    );
    assert_eq!(
        binder.build_handler_chain(&quote_with_foo(1)).ids(),
        vec![on_quote.handler()]
    );
    assert_eq!(
        binder.build_handler_chain(&Event::new()).ids(),
        vec![on_event.handler()]
    );
}

#[test]
fn test_base_pattern_matches_derived_values() {
    let binder = Binder::new();
    let token = binder.bind_fn(&quote_with_foo(5), |_| {});

    let mut timed = TimedQuote::new().with_ts(1);
    timed.set_foo(5);
    assert_eq!(binder.build_handler_chain(&timed).ids(), vec![token.handler()]);

    timed.set_foo(6);
    assert!(binder.build_handler_chain(&timed).is_empty());
}

#[test]
fn test_dispatch_invokes_in_chain_order() {
    let binder = Binder::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["any", "venue"] {
        let log = Arc::clone(&log);
        let pattern = if name == "any" {
            Quote::new()
        } else {
            Quote::new().with_venue("XNAS".into())
        };
        binder.bind_fn(&pattern, move |message| {
            let quote = message.downcast_ref::<Quote>().map(|q| q.venue().clone());
            log.lock().push((name, quote));
        });
    }

    let ran = binder.dispatch(&Quote::new().with_venue("XNAS".into()));
    assert_eq!(ran, 2);
    assert_eq!(
        *log.lock(),
        vec![
            ("any", Some("XNAS".to_string())),
            ("venue", Some("XNAS".to_string()))
        ]
    );
}

#[test]
fn test_scope_detach_removes_only_its_owner() {
    let binder = Arc::new(Binder::new());
    let scope = BindingScope::new(Arc::clone(&binder));
    let other = binder.bind_fn(&Quote::new(), |_| {});
    scope.bind(&Quote::new(), |_| {}).unwrap();
    scope.bind(&quote_with_foo(1), |_| {}).unwrap();
    assert_eq!(binder.binding_count(), 3);

    assert_eq!(scope.detach(), 2);
    assert_eq!(scope.detach(), 0);
    assert_eq!(
        binder.build_handler_chain(&quote_with_foo(1)).ids(),
        vec![other.handler()]
    );
    assert_eq!(binder.slot_count(Quote::TAG.id()), 1);

    let err = scope.bind(&Quote::new(), |_| {}).unwrap_err();
    assert_eq!(err, BinderError::ScopeDetached { owner: scope.owner() });
}

#[test]
fn test_detach_racing_binds_leaves_no_bindings() {
    for _ in 0..20 {
        let binder = Arc::new(Binder::new());
        let scope = Arc::new(BindingScope::new(Arc::clone(&binder)));

        let binders: Vec<_> = (0..4)
            .map(|n| {
                let scope = Arc::clone(&scope);
                thread::spawn(move || {
                    while scope.bind(&quote_with_foo(n), |_| {}).is_ok() {}
                })
            })
            .collect();

        thread::yield_now();
        scope.detach();
        for handle in binders {
            handle.join().unwrap();
        }

        assert!(scope.is_detached());
        assert_eq!(binder.binding_count(), 0);
        assert_eq!(binder.slot_count(Quote::TAG.id()), 0);
    }
}

#[test]
fn test_concurrent_dispatch_and_binding() {
    let binder = Arc::new(Binder::new());
    let base = binder.bind_fn(&Quote::new(), |_| {});

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let binder = Arc::clone(&binder);
            let expected = base.handler();
            thread::spawn(move || {
                for n in 0..500 {
                    let chain = binder.build_handler_chain(&quote_with_foo(n % 7));
                    assert_eq!(chain.ids().first(), Some(&expected));
                }
            })
        })
        .collect();

    let writer = {
        let binder = Arc::clone(&binder);
        thread::spawn(move || {
            for n in 0..200 {
                let token = binder.bind_fn(&quote_with_foo(n % 7), |_| {});
                binder.unbind(&token);
            }
        })
    };

    for handle in readers {
        handle.join().unwrap();
    }
    writer.join().unwrap();
    assert_eq!(binder.binding_count(), 1);
    assert_eq!(binder.slot_count(Quote::TAG.id()), 1);
}

fn probe(values: [Option<u8>; 3]) -> Probe {
    let mut probe = Probe::new();
    if let Some(a) = values[0] {
        probe.set_a(a);
    }
    if let Some(b) = values[1] {
        probe.set_b(b);
    }
    if let Some(c) = values[2] {
        probe.set_c(c);
    }
    probe
}

fn values() -> impl Strategy<Value = [Option<u8>; 3]> {
    [
        proptest::option::of(0u8..3),
        proptest::option::of(0u8..3),
        proptest::option::of(0u8..3),
    ]
}

proptest! {
    #[test]
    fn prop_chain_matches_brute_force(
        patterns in prop::collection::vec(values(), 1..12),
        message in values(),
    ) {
        let binder = Binder::new();
        let bound: Vec<(Probe, HandlerId)> = patterns
            .iter()
            .map(|values| {
                let pattern = probe(*values);
                let handler = Handler::new(|_| {});
                let id = handler.id();
                binder.bind(&pattern, handler);
                (pattern, id)
            })
            .collect();

        let message = probe(message);
        let chain = binder.build_handler_chain(&message);

        let mut expected: Vec<HandlerId> = bound
            .iter()
            .filter(|(pattern, _)| codec::CellExt::equivalent(pattern, &message))
            .map(|(_, id)| *id)
            .collect();
        let mut actual = chain.ids();
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);

        // Slot order: pattern fingerprints never decrease along the chain
        let patterns: Vec<_> = chain
            .ids()
            .iter()
            .filter_map(|id| bound.iter().find(|(_, bound_id)| bound_id == id))
            .map(|(pattern, _)| pattern.fingerprint().clone())
            .collect();
        prop_assert!(patterns.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
