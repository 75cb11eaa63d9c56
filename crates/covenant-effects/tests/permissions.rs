//! Integration tests for frames, peer groups and representation objects.

use std::any::Any;
use std::sync::{Arc, Mutex};

use covenant_effects::{
    ClassInfo, ClassTag, EffectRegistry, ObjectRef, PermissionError, PermissionLevel, Tracked,
    VerificationContext,
};
use proptest::prelude::*;

struct Node {
    class: ClassTag,
    peers: Mutex<Vec<ObjectRef>>,
    reps: Mutex<Vec<ObjectRef>>,
}

impl Tracked for Node {
    fn runtime_class(&self) -> ClassTag {
        self.class.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn node(class: &ClassTag) -> Arc<Node> {
    Arc::new(Node {
        class: class.clone(),
        peers: Mutex::new(Vec::new()),
        reps: Mutex::new(Vec::new()),
    })
}

fn as_ref(n: &Arc<Node>) -> ObjectRef {
    n.clone()
}

fn related(
    pick: fn(&Node) -> &Mutex<Vec<ObjectRef>>,
) -> impl Fn(&ObjectRef, &mut dyn FnMut(ObjectRef)) + Send + Sync {
    move |subject, sink| {
        if let Some(n) = subject.as_any().downcast_ref::<Node>() {
            let items = pick(n).lock().map(|v| v.clone()).unwrap_or_default();
            for o in items {
                sink(o);
            }
        }
    }
}

/// A registry where class `Group` has peers and reps read from `Node`.
fn group_setup() -> (Arc<EffectRegistry>, ClassTag, ClassTag) {
    let registry = Arc::new(EffectRegistry::new());
    let object = ClassTag::root("Object");
    let group = ClassTag::new("Group", &object);
    registry
        .register_class_info(
            &group,
            ClassInfo::new(
                Arc::new(related(|n| &n.reps)),
                Arc::new(related(|n| &n.peers)),
            ),
        )
        .unwrap();
    (registry, object, group)
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[test]
fn granted_iff_requested_in_frame() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = as_ref(&node(&group));
    let b = as_ref(&node(&group));

    let frame = ctx.push_frame();
    assert!(ctx.inspects(&a).unwrap());
    ctx.assert_can_inspect(&a).unwrap();
    assert_eq!(
        ctx.assert_can_mutate(&a).unwrap_err(),
        PermissionError::InsufficientPermission {
            required: PermissionLevel::Mutate,
            class: "Group".into()
        }
    );
    assert_eq!(
        ctx.assert_can_inspect(&b).unwrap_err().to_string(),
        "This code does not have permission to inspect this object."
    );
    ctx.pop_frame(frame).unwrap();
}

#[test]
fn nested_frame_requires_enclosing_grant() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = as_ref(&node(&group));

    let outer = ctx.push_frame();
    ctx.inspects(&a).unwrap();
    let inner = ctx.push_frame();
    ctx.inspects(&a).unwrap();
    assert!(ctx.mutates(&a).is_err());
    ctx.pop_frame(inner).unwrap();
    ctx.pop_frame(outer).unwrap();
}

#[test]
fn outermost_frame_grants_anything() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = as_ref(&node(&group));
    let _frame = ctx.push_frame();
    assert!(ctx.mutates(&a).unwrap());
    ctx.assert_can_mutate(&a).unwrap();
}

#[test]
fn superclass_levels_are_granted_too() {
    let registry = Arc::new(EffectRegistry::new());
    let object = ClassTag::root("Object");
    let shape = ClassTag::new("Shape", &object);
    let square = ClassTag::new("Square", &shape);
    let mut ctx = VerificationContext::new(registry);
    let s = as_ref(&node(&square));
    let _outer = ctx.push_frame();
    ctx.mutates(&s).unwrap();
    let top = ctx.top().unwrap();
    assert_eq!(top.level(&s, &square), PermissionLevel::Mutate);
    assert_eq!(top.level(&s, &shape), PermissionLevel::Mutate);
    assert_eq!(top.level(&s, &object), PermissionLevel::None);
}

// ---------------------------------------------------------------------------
// Peer groups and representation objects
// ---------------------------------------------------------------------------

#[test]
fn peer_group_propagates() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = node(&group);
    let b = node(&group);
    let c = node(&group);
    a.peers.lock().unwrap().push(as_ref(&b));
    b.peers.lock().unwrap().push(as_ref(&c));

    let _frame = ctx.push_frame();
    ctx.mutates(&as_ref(&a)).unwrap();
    ctx.assert_can_mutate(&as_ref(&b)).unwrap();
    ctx.assert_can_mutate(&as_ref(&c)).unwrap();
}

#[test]
fn peer_cycle_terminates() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = node(&group);
    let b = node(&group);
    a.peers.lock().unwrap().push(as_ref(&b));
    b.peers.lock().unwrap().push(as_ref(&a));
    a.peers.lock().unwrap().push(as_ref(&a));

    let _frame = ctx.push_frame();
    ctx.inspects(&as_ref(&b)).unwrap();
    ctx.assert_can_inspect(&as_ref(&a)).unwrap();
}

#[test]
fn representation_objects_require_same_level() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let owner = node(&group);
    let rep = node(&group);
    owner.reps.lock().unwrap().push(as_ref(&rep));

    let outer = ctx.push_frame();
    ctx.mutates(&as_ref(&owner)).unwrap();
    ctx.assert_can_mutate(&as_ref(&rep)).unwrap();

    // The nested frame can only obtain what the enclosing frame holds, reps included.
    let inner = ctx.push_frame();
    ctx.mutates(&as_ref(&owner)).unwrap();
    ctx.pop_frame(inner).unwrap();
    ctx.pop_frame(outer).unwrap();
}

#[test]
fn representation_cycle_terminates() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = node(&group);
    let b = node(&group);
    a.reps.lock().unwrap().push(as_ref(&b));
    b.reps.lock().unwrap().push(as_ref(&a));
    let _frame = ctx.push_frame();
    ctx.inspects(&as_ref(&a)).unwrap();
    ctx.assert_can_inspect(&as_ref(&b)).unwrap();
}

#[test]
fn missing_rep_grant_in_enclosing_frame_fails() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let owner = node(&group);
    let rep = node(&group);

    let outer = ctx.push_frame();
    ctx.mutates(&as_ref(&owner)).unwrap();
    // The rep is attached only after the outer grant was taken.
    owner.reps.lock().unwrap().push(as_ref(&rep));
    let inner = ctx.push_frame();
    assert!(ctx.mutates(&as_ref(&owner)).is_err());
    ctx.pop_frame(inner).unwrap();
    ctx.pop_frame(outer).unwrap();
}

#[test]
fn pop_merges_by_maximum() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = as_ref(&node(&group));
    let outer = ctx.push_frame();
    ctx.inspects(&a).unwrap();
    {
        let guard = ctx.enter();
        guard.assert_can_create(&a);
    }
    // MUTATE granted by creation in the inner frame survives the pop.
    ctx.assert_can_mutate(&a).unwrap();
    ctx.pop_frame(outer).unwrap();
}

#[test]
fn inspects_all_stops_at_first_failure() {
    let (registry, _, group) = group_setup();
    let mut ctx = VerificationContext::new(registry);
    let a = as_ref(&node(&group));
    let b = as_ref(&node(&group));
    let outer = ctx.push_frame();
    ctx.inspects(&a).unwrap();
    let inner = ctx.push_frame();
    assert!(ctx.inspects_all(vec![a.clone()]).unwrap());
    assert!(ctx.inspects_all(vec![a.clone(), b.clone()]).is_err());
    assert!(ctx.mutates_all(Vec::<ObjectRef>::new()).unwrap());
    ctx.pop_frame(inner).unwrap();
    ctx.pop_frame(outer).unwrap();
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn level() -> impl Strategy<Value = PermissionLevel> {
    prop_oneof![
        Just(PermissionLevel::None),
        Just(PermissionLevel::Inspect),
        Just(PermissionLevel::Mutate),
    ]
}

proptest! {
    #[test]
    fn grant_keeps_maximum(levels in proptest::collection::vec(level(), 1..8)) {
        let (registry, _, group) = group_setup();
        let mut ctx = VerificationContext::new(registry);
        let a = as_ref(&node(&group));
        let _frame = ctx.push_frame();
        let top = ctx.top().unwrap();
        for l in &levels {
            top.grant(&a, &group, *l);
        }
        let expected = levels.iter().copied().max().unwrap_or_default();
        prop_assert_eq!(top.level(&a, &group), expected);
        prop_assert_eq!(
            ctx.assert_can_inspect(&a).is_ok(),
            expected.satisfies(PermissionLevel::Inspect)
        );
    }

    #[test]
    fn random_peer_graphs_terminate(
        size in 1usize..8,
        edges in proptest::collection::vec((0usize..8, 0usize..8), 0..24),
    ) {
        let (registry, _, group) = group_setup();
        let mut ctx = VerificationContext::new(registry);
        let nodes: Vec<Arc<Node>> = (0..size).map(|_| node(&group)).collect();
        for (from, to) in edges {
            if from < size && to < size {
                nodes[from].peers.lock().unwrap().push(as_ref(&nodes[to]));
            }
        }
        let _frame = ctx.push_frame();
        prop_assert!(ctx.inspects(&as_ref(&nodes[0])).unwrap());
        ctx.assert_can_inspect(&as_ref(&nodes[0])).unwrap();
    }
}
