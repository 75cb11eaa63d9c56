use std::fmt;
use std::sync::Arc;

use crate::object::ObjectRef;

/// Enumerates the objects related to a subject, calling the sink once per object.
pub type RelatedObjects = Arc<dyn Fn(&ObjectRef, &mut dyn FnMut(ObjectRef)) + Send + Sync>;

/// Per-class description of the objects a permission on an instance extends to.
///
/// Representation objects are owned by the subject: a permission on the
/// subject at some class requires the same permission on each of them.
/// Peer objects form a group with the subject: a permission on any member is a
/// permission on the whole group.
#[derive(Clone)]
pub struct ClassInfo {
    representation: RelatedObjects,
    peers: RelatedObjects,
}

fn none() -> RelatedObjects {
    fn nothing(_: &ObjectRef, _: &mut dyn FnMut(ObjectRef)) {}
    Arc::new(nothing)
}

impl ClassInfo {
    pub fn new(representation: RelatedObjects, peers: RelatedObjects) -> Self {
        ClassInfo {
            representation,
            peers,
        }
    }

    pub fn with_representation(
        f: impl Fn(&ObjectRef, &mut dyn FnMut(ObjectRef)) + Send + Sync + 'static,
    ) -> Self {
        ClassInfo::new(Arc::new(f), none())
    }

    pub fn with_peers(
        f: impl Fn(&ObjectRef, &mut dyn FnMut(ObjectRef)) + Send + Sync + 'static,
    ) -> Self {
        ClassInfo::new(none(), Arc::new(f))
    }

    pub fn for_each_representation_object(
        &self,
        subject: &ObjectRef,
        sink: &mut dyn FnMut(ObjectRef),
    ) {
        (self.representation)(subject, sink)
    }

    pub fn for_each_peer_object(&self, subject: &ObjectRef, sink: &mut dyn FnMut(ObjectRef)) {
        (self.peers)(subject, sink)
    }

    pub fn representation_objects(&self, subject: &ObjectRef) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        self.for_each_representation_object(subject, &mut |o| out.push(o));
        out
    }

    pub fn peer_objects(&self, subject: &ObjectRef) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        self.for_each_peer_object(subject, &mut |o| out.push(o));
        out
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo").finish_non_exhaustive()
    }
}
