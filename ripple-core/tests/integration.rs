//! Integration Tests for the Reactive Engine
//!
//! These tests verify that wrappers, effects, refs and computed values work
//! together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ripple_core::{
    computed, effect, is_reactive, mark_raw, reactive, ref_value, to_raw, DebugOp,
    EffectOptions, Object, Reactive, ReactiveError, Runtime, TargetKind, Value,
};
use serde_json::json;

fn wrapped(value: Value) -> Reactive {
    match value {
        Value::Reactive(reactive) => reactive,
        other => panic!("expected a wrapper, got {other:?}"),
    }
}

/// Counter incremented by an effect body.
fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let runs = Rc::new(Cell::new(0));
    (runs.clone(), runs)
}

/// Wrapping the same target twice returns the same wrapper.
#[test]
fn wrapping_is_idempotent() {
    let raw = Object::record();
    let first = wrapped(reactive(raw.clone()));
    let second = wrapped(reactive(raw.clone()));
    assert!(first.ptr_eq(&second));

    let again = wrapped(reactive(Value::Reactive(first.clone())));
    assert!(again.ptr_eq(&first));

    assert!(is_reactive(&Value::Reactive(first.clone())));
    assert_eq!(to_raw(&Value::Reactive(first)), Value::Object(raw));
}

/// Writes through the wrapper are visible on the raw target and back.
#[test]
fn raw_and_wrapper_share_state() {
    let runtime = Runtime::new();

    let record = Object::record();
    let state = runtime.wrap(&record).unwrap();
    state.set("a", 1).unwrap();
    assert_eq!(record.get("a"), Value::from(1));
    record.set("b", 2).unwrap();
    assert_eq!(state.get("b"), Value::from(2));

    let list = Object::sequence([1]);
    let wrapped_list = runtime.wrap(&list).unwrap();
    wrapped_list.push(2).unwrap();
    assert_eq!(list.len().unwrap(), 2);

    let map = Object::map();
    let wrapped_map = runtime.wrap(&map).unwrap();
    wrapped_map.set("k", "v").unwrap();
    assert_eq!(map.get("k"), Value::from("v"));
    map.set("k2", "v2").unwrap();
    assert_eq!(wrapped_map.get("k2"), Value::from("v2"));
}

/// Writing a new index adds it, bumps `length`, and only readers of the
/// affected keys re-run.
#[test]
fn add_set_delete_are_distinguished() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence([0])).unwrap();

    let third = Rc::new(RefCell::new(Value::Undefined));
    let (l, out) = (list.clone(), third.clone());
    let _index = runtime.effect(move || *out.borrow_mut() = l.get(3));

    let length = Rc::new(Cell::new(0));
    let (length_runs, runs) = counter();
    let (l, out) = (list.clone(), length.clone());
    let _length = runtime.effect(move || {
        out.set(l.len().unwrap());
        runs.set(runs.get() + 1);
    });

    assert_eq!(*third.borrow(), Value::Undefined);
    assert_eq!(length.get(), 1);

    list.set(3, 1).unwrap();
    assert_eq!(*third.borrow(), Value::from(1));
    assert_eq!(length.get(), 4);
    assert_eq!(length_runs.get(), 2);

    // Overwriting an existing index leaves `length` readers alone.
    list.set(0, 5).unwrap();
    assert_eq!(length_runs.get(), 2);
}

/// Deleting an index leaves a hole; deleting the hole again is a no-op.
#[test]
fn deleting_a_hole_does_not_notify() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence([1, 2])).unwrap();
    let (runs, r) = counter();

    let l = list.clone();
    let _effect = runtime.effect(move || {
        l.get(0);
        r.set(r.get() + 1);
    });

    assert!(list.delete(0).unwrap());
    assert_eq!(runs.get(), 2);
    assert!(!list.delete(0).unwrap());
    assert_eq!(runs.get(), 2);
    assert!(!list.has(0));
    assert_eq!(list.len().unwrap(), 2);
}

/// Oversized lengths are rejected before anything is allocated or notified.
#[test]
fn oversized_lengths_are_rejected() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence([1])).unwrap();
    let (runs, r) = counter();

    let l = list.clone();
    let _effect = runtime.effect(move || {
        l.len().unwrap();
        r.set(r.get() + 1);
    });

    assert!(matches!(
        list.set("length", 4_294_967_295u32),
        Err(ReactiveError::InvalidLength(_))
    ));
    assert!(matches!(
        list.set(4_000_000_000u32, 1),
        Err(ReactiveError::InvalidLength(_))
    ));
    assert_eq!(list.len().unwrap(), 1);
    assert_eq!(runs.get(), 1);
}

/// A map holding NaN does not re-run when NaN is written again.
#[test]
fn nan_writes_are_not_changes() {
    let runtime = Runtime::new();
    let map = runtime
        .wrap(&Object::map_from([("foo", f64::NAN)]))
        .unwrap();
    let (runs, r) = counter();

    let m = map.clone();
    let _effect = runtime.effect(move || {
        m.get("foo");
        r.set(r.get() + 1);
    });

    map.set("foo", f64::NAN).unwrap();
    assert_eq!(runs.get(), 1);
}

/// Dependencies follow the branch the effect actually took.
#[test]
fn branches_are_retracked_on_every_run() {
    let runtime = Runtime::new();
    let state = wrapped(runtime.reactive(json!({ "run": false, "prop": "value" })));
    let dummy = Rc::new(RefCell::new(Value::Undefined));
    let (runs, r) = counter();

    let (s, out) = (state.clone(), dummy.clone());
    let _effect = runtime.effect(move || {
        r.set(r.get() + 1);
        *out.borrow_mut() = if s.get("run").is_truthy() {
            s.get("prop")
        } else {
            Value::from("other")
        };
    });
    assert_eq!(*dummy.borrow(), Value::from("other"));

    state.set("prop", "hi").unwrap();
    assert_eq!(runs.get(), 1);

    state.set("run", true).unwrap();
    assert_eq!(*dummy.borrow(), Value::from("hi"));
    state.set("prop", "world").unwrap();
    assert_eq!(*dummy.borrow(), Value::from("world"));
    assert_eq!(runs.get(), 3);
}

/// A computed does nothing until read and recomputes once per read after
/// any number of input changes.
#[test]
fn computed_is_lazy() {
    let runtime = Runtime::new();
    let state = wrapped(runtime.reactive(json!({ "left": 1, "right": 2 })));
    let (calls, c) = counter();

    let s = state.clone();
    let sum = runtime.computed(move || {
        c.set(c.get() + 1);
        s.get("left").as_f64().unwrap_or_default() + s.get("right").as_f64().unwrap_or_default()
    });
    assert_eq!(calls.get(), 0);

    assert_eq!(sum.get(), Value::from(3));
    assert_eq!(calls.get(), 1);

    state.set("left", 10).unwrap();
    state.set("left", 20).unwrap();
    assert_eq!(calls.get(), 1);

    assert_eq!(sum.get(), Value::from(22));
    assert_eq!(calls.get(), 2);
}

/// A wrapped object used as a key in the raw map is still found through the
/// wrapper, and deleting it notifies `has` readers.
#[test]
fn wrapped_keys_in_raw_collections() {
    let runtime = Runtime::new();
    let raw_map = Object::map();
    let key = runtime.wrap(&Object::record()).unwrap();
    raw_map.set(key.clone(), 1).unwrap();

    let map = runtime.wrap(&raw_map).unwrap();
    assert!(map.has(key.clone()));
    assert_eq!(map.get(key.clone()), Value::from(1));

    let present = Rc::new(Cell::new(false));
    let (m, k, out) = (map.clone(), key.clone(), present.clone());
    let _effect = runtime.effect(move || out.set(m.has(k.clone())));
    assert!(present.get());

    assert!(map.delete(key).unwrap());
    assert!(!present.get());
}

/// Effects that push into the sequence they observe do not loop.
#[test]
fn pushing_inside_effects_terminates() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence(Vec::<Value>::new())).unwrap();

    let l = list.clone();
    let _first = runtime.effect(move || {
        l.push(1).unwrap();
    });
    let l = list.clone();
    let _second = runtime.effect(move || {
        l.push(2).unwrap();
    });

    assert_eq!(list.raw().to_vec().unwrap(), vec![Value::from(1), Value::from(2)]);
}

/// An effect reading `length` and pushing re-runs once per outside write,
/// never on its own push.
#[test]
fn effect_reading_and_mutating_the_same_sequence() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence([0])).unwrap();
    let (runs, r) = counter();

    let l = list.clone();
    let _effect = runtime.effect(move || {
        r.set(r.get() + 1);
        if l.len().unwrap() < 3 {
            l.push(0).unwrap();
        }
    });
    assert_eq!(runs.get(), 1);
    assert_eq!(list.raw().len().unwrap(), 2);

    list.set(5, 1).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(list.raw().len().unwrap(), 6);
}

/// A scheduler is called instead of re-running.
#[test]
fn scheduler_replaces_rerun() {
    let runtime = Runtime::new();
    let count = runtime.ref_value(0);
    let (scheduled, sc) = counter();
    let (runs, r) = counter();

    let c = count.clone();
    let effect = runtime.effect_with(
        move || {
            c.get();
            r.set(r.get() + 1);
        },
        EffectOptions::new().scheduler(move || sc.set(sc.get() + 1)),
    );

    count.set(1).unwrap();
    assert_eq!(scheduled.get(), 1);
    assert_eq!(runs.get(), 1);

    effect.run();
    assert_eq!(runs.get(), 2);
}

/// A lazy effect tracks nothing until its first run.
#[test]
fn lazy_effect() {
    let runtime = Runtime::new();
    let count = runtime.ref_value(0);
    let (runs, r) = counter();

    let c = count.clone();
    let effect = runtime.effect_with(
        move || {
            c.get();
            r.set(r.get() + 1);
        },
        EffectOptions::new().lazy(),
    );
    count.set(1).unwrap();
    assert_eq!(runs.get(), 0);

    effect.run();
    count.set(2).unwrap();
    assert_eq!(runs.get(), 2);
}

/// A stopped effect is never notified again.
#[test]
fn stop_detaches_effect() {
    let runtime = Runtime::new();
    let count = runtime.ref_value(0);
    let (runs, r) = counter();

    let c = count.clone();
    let effect = runtime.effect(move || {
        c.get();
        r.set(r.get() + 1);
    });
    ripple_core::stop(&effect);
    assert_eq!(effect.dependency_count(), 0);

    count.set(1).unwrap();
    assert_eq!(runs.get(), 1);
}

/// Dropping the last handle retires the effect.
#[test]
fn dropped_effect_stops_running() {
    let runtime = Runtime::new();
    let count = runtime.ref_value(0);
    let (runs, r) = counter();

    let c = count.clone();
    let effect = runtime.effect(move || {
        c.get();
        r.set(r.get() + 1);
    });
    drop(effect);

    count.set(1).unwrap();
    assert_eq!(runs.get(), 1);
}

/// Debug hooks see tracked keys and the write that triggered a re-run.
#[test]
fn debug_hooks_report_events() {
    let runtime = Runtime::new();
    let state = runtime.wrap(&Object::record_from([("a", 1)])).unwrap();
    let tracked = Rc::new(RefCell::new(Vec::new()));
    let triggered = Rc::new(RefCell::new(Vec::new()));

    let (s, t, g) = (state.clone(), tracked.clone(), triggered.clone());
    let _effect = runtime.effect_with(
        move || {
            s.get("a");
        },
        EffectOptions::new()
            .on_track(move |event| t.borrow_mut().push(event.op))
            .on_trigger(move |event| g.borrow_mut().push(event.op)),
    );

    state.set("a", 2).unwrap();
    assert_eq!(
        *tracked.borrow(),
        vec![
            DebugOp::Track(ripple_core::graph::TrackOp::Get),
            DebugOp::Track(ripple_core::graph::TrackOp::Get)
        ]
    );
    assert_eq!(
        *triggered.borrow(),
        vec![DebugOp::Trigger(ripple_core::graph::TriggerOp::Set)]
    );
}

/// Clearing a collection notifies every reader, once.
#[test]
fn clear_notifies_readers() {
    let runtime = Runtime::new();
    let set = runtime.wrap(&Object::set_from([1, 2])).unwrap();
    let (runs, r) = counter();

    let s = set.clone();
    let _effect = runtime.effect(move || {
        s.has(1);
        s.has(2);
        r.set(r.get() + 1);
    });

    set.clear().unwrap();
    assert_eq!(runs.get(), 2);
    set.clear().unwrap();
    assert_eq!(runs.get(), 2);
}

/// `for_each` readers see additions; `keys` readers ignore value writes.
#[test]
fn collection_iteration_tracking() {
    let runtime = Runtime::new();
    let map = runtime.wrap(&Object::map_from([("a", 1)])).unwrap();
    let total = Rc::new(Cell::new(0.0));
    let (key_runs, kr) = counter();

    let (m, out) = (map.clone(), total.clone());
    let _sum = runtime.effect(move || {
        let mut sum = 0.0;
        m.for_each(|value, _| sum += value.as_f64().unwrap_or_default())
            .unwrap();
        out.set(sum);
    });
    let m = map.clone();
    let _keys = runtime.effect(move || {
        m.keys().unwrap();
        kr.set(kr.get() + 1);
    });

    map.set("a", 5).unwrap();
    assert_eq!(total.get(), 5.0);
    assert_eq!(key_runs.get(), 1);

    map.set("b", 1).unwrap();
    assert_eq!(total.get(), 6.0);
    assert_eq!(key_runs.get(), 2);
}

/// Shrinking `length` notifies readers of the removed indices only.
#[test]
fn length_truncation() {
    let runtime = Runtime::new();
    let list = runtime.wrap(&Object::sequence([1, 2, 3])).unwrap();
    let (first_runs, fr) = counter();
    let last = Rc::new(RefCell::new(Value::Undefined));

    let l = list.clone();
    let _first = runtime.effect(move || {
        l.get(0);
        fr.set(fr.get() + 1);
    });
    let (l, out) = (list.clone(), last.clone());
    let _last = runtime.effect(move || *out.borrow_mut() = l.get(2));

    list.set("length", 1).unwrap();
    assert_eq!(*last.borrow(), Value::Undefined);
    assert_eq!(first_runs.get(), 1);
    assert_eq!(list.raw().len().unwrap(), 1);
}

/// `includes` accepts the raw form of a stored target.
#[test]
fn includes_with_raw_argument() {
    let runtime = Runtime::new();
    let item = Object::record();
    let list = runtime.wrap(&Object::sequence([item.clone()])).unwrap();

    assert!(list.includes(item.clone()).unwrap());
    assert_eq!(list.index_of(item).unwrap(), Some(0));
}

/// Refs at sequence indices are kept; refs in records unwrap and write through.
#[test]
fn refs_inside_targets() {
    let runtime = Runtime::new();
    let count = runtime.ref_value(1);

    let list = runtime.wrap(&Object::sequence([count.clone()])).unwrap();
    assert!(matches!(list.get(0), Value::Ref(_)));

    let record = runtime
        .wrap(&Object::record_from([("count", count.clone())]))
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (r, out) = (record.clone(), seen.clone());
    let _effect = runtime.effect(move || out.borrow_mut().push(r.get("count")));

    record.set("count", 2).unwrap();
    assert_eq!(count.get(), Value::from(2));
    count.set(3).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2), Value::from(3)]);
}

/// Property refs, ref maps, ref-unwrapping views and custom refs.
#[test]
fn derived_refs() {
    let runtime = Runtime::new();
    let state = runtime.reactive(json!({ "a": 1, "b": 2 }));

    let a = runtime.to_ref(&state, "a").unwrap();
    let refs = runtime.to_refs(&state).unwrap();
    refs["b"].set(20).unwrap();
    a.set(10).unwrap();
    let wrapper = wrapped(state.clone());
    assert_eq!(wrapper.get("a"), Value::from(10));
    assert_eq!(wrapper.get("b"), Value::from(20));

    let count = runtime.ref_value(1);
    let raw = Object::record_from([("count", count.clone())]);
    let view = ripple_core::proxy_refs(&Value::Object(raw)).unwrap();
    view.set("count", 4).unwrap();
    assert_eq!(view.get("count"), Value::from(4));
    assert_eq!(count.get(), Value::from(4));

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let custom = runtime.custom_ref(move |tracker| {
        let value = Rc::new(RefCell::new(Value::from(0)));
        let (read, read_tracker) = (value.clone(), tracker.clone());
        (
            move || {
                read_tracker.track();
                read.borrow().clone()
            },
            move |next: Value| {
                sink.borrow_mut().push(next.clone());
                *value.borrow_mut() = next;
                tracker.trigger();
            },
        )
    });
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (c, out) = (custom.clone(), seen.clone());
    let _effect = runtime.effect(move || out.borrow_mut().push(c.get()));

    custom.set(5).unwrap();
    custom.set(5).unwrap();
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(
        *seen.borrow(),
        vec![Value::from(0), Value::from(5), Value::from(5)]
    );
}

/// Computed values chain, and effects over them see fresh values.
#[test]
fn computed_chains_with_free_functions() {
    let source = ref_value(1);
    let s = source.clone();
    let doubled = computed(move || s.get().as_f64().unwrap_or_default() * 2.0);
    let d = doubled.clone();
    let quadrupled = computed(move || d.get().as_f64().unwrap_or_default() * 2.0);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (q, out) = (quadrupled.clone(), seen.clone());
    let _effect = effect(move || out.borrow_mut().push(q.get()));

    source.set(2).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(4), Value::from(8)]);
    assert_eq!(
        quadrupled.set(1),
        Err(ReactiveError::ReadonlyComputed)
    );
}

/// Weak maps look entries up by identity and refuse enumeration.
#[test]
fn weak_maps() {
    let runtime = Runtime::new();
    let weak = runtime.wrap(&Object::weak_map()).unwrap();
    let key = Object::record();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (w, k, out) = (weak.clone(), key.clone(), seen.clone());
    let _effect = runtime.effect(move || out.borrow_mut().push(w.get(k.clone())));

    weak.set(key.clone(), 1).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Undefined, Value::from(1)]);
    assert!(matches!(
        weak.size(),
        Err(ReactiveError::Unsupported {
            kind: TargetKind::WeakMap,
            ..
        })
    ));
    assert!(matches!(
        weak.set(1, 1),
        Err(ReactiveError::InvalidWeakKey)
    ));
}

/// A target keeps one wrapper identity even when every handle to the
/// wrapper is dropped in between, so wrapper keys stay valid.
#[test]
fn wrapper_identity_outlives_its_handles() {
    let runtime = Runtime::new();
    let target = Object::record();
    let raw_weak = Object::weak_map();

    let first = runtime.wrap(&target).unwrap();
    let id = first.id();
    raw_weak.set(first, 1).unwrap();

    let again = wrapped(runtime.reactive(target.clone()));
    assert_eq!(again.id(), id);
    let weak = runtime.wrap(&raw_weak).unwrap();
    assert!(weak.has(again.clone()));
    assert_eq!(weak.get(again), Value::from(1));
}

/// Targets marked raw are never wrapped.
#[test]
fn marked_raw_targets_pass_through() {
    let raw = Object::record();
    mark_raw(&raw);
    assert_eq!(reactive(raw.clone()), Value::Object(raw));
}

/// Nested wrappers are created lazily and are themselves reactive.
#[test]
fn deep_reactivity() {
    let runtime = Runtime::new();
    let state = wrapped(runtime.reactive(json!({ "nested": { "count": 0 } })));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (s, out) = (state.clone(), seen.clone());
    let _effect = runtime.effect(move || {
        let nested = wrapped(s.get("nested"));
        out.borrow_mut().push(nested.get("count"));
    });

    wrapped(state.get("nested")).set("count", 1).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(0), Value::from(1)]);
}

/// Separate runtimes do not see each other's effects.
#[test]
fn runtimes_are_isolated() {
    let a = Runtime::new();
    let b = Runtime::new();
    let raw = Object::record_from([("n", 0)]);
    let in_a = a.wrap(&raw).unwrap();
    let in_b = b.wrap(&raw).unwrap();
    let (runs, r) = counter();

    let s = in_a.clone();
    let _effect = a.effect(move || {
        s.get("n");
        r.set(r.get() + 1);
    });

    in_b.set("n", 1).unwrap();
    assert_eq!(runs.get(), 1);
    in_a.set("n", 2).unwrap();
    assert_eq!(runs.get(), 2);
}
