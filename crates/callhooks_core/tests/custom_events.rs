//! A target with its own event set, emitting events from inside its body.

use std::sync::{Arc, Mutex, Weak};

use callhooks_core::{
    EventSpec, Events, FnTarget, MethodRegistry, OnCall, OnReturn, OptionKey, Registration,
    Registry, ScopedTarget,
};

type Iteration = OnCall<u32, String>;
type Done = OnReturn<u32, Vec<u32>, String>;
type Count = Registry<FnTarget<u32, Vec<u32>, String>>;
type Tracker = Arc<Mutex<Vec<String>>>;

/// `count(n)` returns `0..n`, emitting `on_iteration` for every element and
/// `on_return` with the finished list.
fn count() -> Arc<Count> {
    Arc::new_cyclic(|registry: &Weak<Count>| {
        let registry = Weak::clone(registry);
        let target: Arc<FnTarget<u32, Vec<u32>, String>> = Arc::new(move |num: &u32| {
            let Some(registry) = registry.upgrade() else {
                return Err("registry dropped".to_string());
            };
            let mut result = Vec::new();
            for i in 0..*num {
                if let Some(on_iteration) = registry.event::<Iteration>("on_iteration") {
                    on_iteration.emit(&i)?;
                }
                result.push(i);
            }
            if let Some(on_return) = registry.event::<Done>("on_return") {
                on_return.emit(Some(&result), num)?;
            }
            Ok(result)
        });

        Registry::builder("count", target)
            .event(EventSpec::new::<Iteration>("on_iteration").with_option(OptionKey::PassArgs, true))
            .event(
                EventSpec::new::<Done>("on_return")
                    .with_option(OptionKey::PassArgs, false)
                    .with_option(OptionKey::PassResult, true),
            )
            .event(EventSpec::new::<Done>("unused"))
            .build()
            .unwrap()
    })
}

#[test]
fn registry_exposes_declared_events() {
    let count = count();
    assert_eq!(
        count.event_names().collect::<Vec<_>>(),
        vec!["on_iteration", "on_return", "unused"]
    );
    let on_iteration = count.event::<Iteration>("on_iteration").unwrap();
    assert!(on_iteration.parents().is_empty());
    assert!(on_iteration.ids().is_empty());
    assert_eq!(on_iteration.target_name(), "count");
}

#[test]
fn event_defaults_follow_declaration() {
    let count = count();
    let on_return = count.event::<Done>("on_return").unwrap();
    assert_eq!(
        on_return.options().iter().collect::<Vec<_>>(),
        vec![(OptionKey::PassArgs, false), (OptionKey::PassResult, true)]
    );
    let on_iteration = count.event::<Iteration>("on_iteration").unwrap();
    assert_eq!(
        on_iteration.options().iter().collect::<Vec<_>>(),
        vec![(OptionKey::PassArgs, true)]
    );
}

#[test]
fn target_emits_its_own_events() {
    let count = count();
    let tracker = Tracker::default();
    assert_eq!(count.call(&2), Ok(vec![0, 1]));
    assert!(tracker.lock().unwrap().is_empty());

    let results = Arc::clone(&tracker);
    count
        .event::<Done>("on_return")
        .unwrap()
        .add_callback(
            move |result, _| {
                results.lock().unwrap().push(format!("result {:?}", result.cloned().unwrap_or_default()));
                Ok(())
            },
            Registration::new(),
        )
        .unwrap();

    assert_eq!(count.call(&2), Ok(vec![0, 1]));
    assert_eq!(*tracker.lock().unwrap(), vec!["result [0, 1]"]);

    let iterations = Arc::clone(&tracker);
    count
        .event::<Iteration>("on_iteration")
        .unwrap()
        .add_callback(
            move |value| {
                iterations.lock().unwrap().push(format!("iter {}", value.copied().unwrap_or_default()));
                Ok(())
            },
            Registration::new(),
        )
        .unwrap();

    assert_eq!(count.call(&3), Ok(vec![0, 1, 2]));
    assert_eq!(
        *tracker.lock().unwrap(),
        vec![
            "result [0, 1]",
            "iter 0",
            "iter 1",
            "iter 2",
            "result [0, 1, 2]",
        ]
    );

    count.remove_callbacks();
    assert_eq!(count.num_callbacks(), 0);
}

#[test]
fn listener_error_surfaces_from_target() {
    let count = count();
    count
        .event::<Iteration>("on_iteration")
        .unwrap()
        .add_callback(
            |value| match value {
                Some(2) => Err("stop at 2".to_string()),
                _ => Ok(()),
            },
            Registration::new(),
        )
        .unwrap();
    assert_eq!(count.call(&5), Err("stop at 2".to_string()));
    assert_eq!(count.call(&2), Ok(vec![0, 1]));
}

#[test]
fn wrong_kind_is_not_found() {
    let count = count();
    assert!(count.event::<Done>("on_iteration").is_none());
    assert!(count.event::<Iteration>("unused").is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-owner events on a method
// ─────────────────────────────────────────────────────────────────────────────

struct Walker {
    name: &'static str,
}

/// `walk(n)` on a `Walker` emits `on_iteration` for each of `0..n` on the
/// events it is called with and returns `n`.
fn walk() -> MethodRegistry<Walker, u32, u32, String> {
    let target: Arc<ScopedTarget<Walker, u32, u32, String>> =
        Arc::new(|_: &Walker, events: &Events, num: &u32| {
            if let Some(on_iteration) = events.event::<Iteration>("on_iteration") {
                for i in 0..*num {
                    on_iteration.emit(&i)?;
                }
            }
            Ok(*num)
        });
    MethodRegistry::new(
        Registry::builder("walk", target)
            .event(EventSpec::new::<Iteration>("on_iteration"))
            .build()
            .unwrap(),
    )
}

fn record(tracker: &Tracker, label: &'static str) -> impl Fn(Option<&u32>) -> Result<(), String> + Send + Sync + 'static {
    let tracker = Arc::clone(tracker);
    move |value| {
        tracker.lock().unwrap().push(format!("{label} {}", value.copied().unwrap_or_default()));
        Ok(())
    }
}

#[test]
fn owners_of_a_method_get_independent_custom_events() {
    let walk = walk();
    let tracker = Tracker::default();
    let first = Arc::new(Walker { name: "first" });
    let second = Arc::new(Walker { name: "second" });

    walk.event::<Iteration>("on_iteration")
        .unwrap()
        .add_callback(record(&tracker, "class"), Registration::new())
        .unwrap();
    walk.bind(&first)
        .event::<Iteration>("on_iteration")
        .unwrap()
        .add_callback(record(&tracker, first.name), Registration::new())
        .unwrap();
    walk.bind(&second)
        .event::<Iteration>("on_iteration")
        .unwrap()
        .add_callback(record(&tracker, second.name), Registration::new())
        .unwrap();

    assert_eq!(walk.bind(&first).call(&2), Ok(2));
    assert_eq!(
        *tracker.lock().unwrap(),
        vec!["first 0", "class 0", "first 1", "class 1"]
    );

    tracker.lock().unwrap().clear();
    assert_eq!(walk.bind(&second).call(&1), Ok(1));
    assert_eq!(*tracker.lock().unwrap(), vec!["second 0", "class 0"]);

    assert_eq!(walk.num_callbacks(), 1);
    assert_eq!(walk.bind(&first).num_callbacks(), 1);
    assert_eq!(walk.bind(&first).num_visible_callbacks(), 2);
    assert_eq!(walk.bound_instances(), 2);

    tracker.lock().unwrap().clear();
    walk.bind(&first).remove_callbacks();
    assert_eq!(walk.bind(&first).call(&1), Ok(1));
    assert_eq!(walk.bind(&second).call(&1), Ok(1));
    assert_eq!(*tracker.lock().unwrap(), vec!["class 0", "second 0", "class 0"]);

    drop(first);
    assert_eq!(walk.bound_instances(), 1);
}
