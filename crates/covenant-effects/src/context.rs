//! The frame stack of one executing interpreter.
//!
//! Every `assert_*` query consults only the top frame. A nested frame obtains
//! permissions from its enclosing frame through [`VerificationContext::requires_permission`],
//! and hands everything it holds back to the enclosing frame when popped.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::PermissionError;
use crate::frame::{FrameId, PermissionFrame};
use crate::level::PermissionLevel;
use crate::object::{address, ClassTag, ObjectRef};
use crate::registry::EffectRegistry;

/// Owned LIFO stack of permission frames.
pub struct VerificationContext {
    registry: Arc<EffectRegistry>,
    frames: Vec<PermissionFrame>,
    next_id: u64,
}

impl VerificationContext {
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        VerificationContext {
            registry,
            frames: Vec::new(),
            next_id: 0,
        }
    }

    /// A context over [`EffectRegistry::global`].
    pub fn with_global_registry() -> Self {
        Self::new(EffectRegistry::global())
    }

    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.registry
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn top(&self) -> Option<&PermissionFrame> {
        self.frames.last()
    }

    pub fn push_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.frames.push(PermissionFrame::new(id));
        trace!(frame = id.0, depth = self.frames.len(), "pushed permission frame");
        id
    }

    /// Pop the top frame, merging its grants into the enclosing frame.
    pub fn pop_frame(&mut self, id: FrameId) -> Result<(), PermissionError> {
        if self.frames.last().map(PermissionFrame::id) != Some(id) {
            return Err(PermissionError::NotTopFrame);
        }
        if let Some(frame) = self.frames.pop() {
            if let Some(enclosing) = self.frames.last() {
                frame.merge_into(enclosing);
            }
        }
        trace!(frame = id.0, depth = self.frames.len(), "popped permission frame");
        Ok(())
    }

    /// Push a frame that is popped when the guard is dropped.
    pub fn enter(&mut self) -> FrameGuard<'_> {
        let id = self.push_frame();
        FrameGuard { ctx: self, id }
    }

    fn assert_level(&self, object: &ObjectRef, level: PermissionLevel) -> Result<(), PermissionError> {
        match self.frames.last() {
            Some(top) => top.assert_permission(object, &object.runtime_class(), level),
            None => Ok(()),
        }
    }

    /// No-op when no frame is active.
    pub fn assert_can_inspect(&self, object: &ObjectRef) -> Result<(), PermissionError> {
        self.assert_level(object, PermissionLevel::Inspect)
    }

    /// No-op when no frame is active.
    pub fn assert_can_mutate(&self, object: &ObjectRef) -> Result<(), PermissionError> {
        self.assert_level(object, PermissionLevel::Mutate)
    }

    /// Grant MUTATE on every class of `object` the first time the object is
    /// seen at that class. No-op when no frame is active.
    pub fn assert_can_create(&self, object: &ObjectRef) {
        let Some(top) = self.frames.last() else {
            return;
        };
        let class = object.runtime_class();
        for c in class.chain() {
            if self.registry.mark_created(object, c) {
                top.grant(object, c, PermissionLevel::Mutate);
            }
        }
    }

    /// Require `level` on `object` viewed as `class` from the enclosing frame
    /// (if any) and grant it in the current frame. Extends to superclasses,
    /// representation objects and the peer group of `object`.
    pub fn requires_permission(
        &self,
        object: &ObjectRef,
        class: &ClassTag,
        level: PermissionLevel,
    ) -> Result<(), PermissionError> {
        let (current, rest) = self
            .frames
            .split_last()
            .ok_or(PermissionError::NoActiveFrame)?;
        let mut walk = PermissionWalk {
            registry: &self.registry,
            current,
            enclosing: rest.last(),
            level,
            processed: HashSet::new(),
        };
        walk.peer_group(object, class, &mut HashSet::new())
    }

    pub fn inspects(&self, object: &ObjectRef) -> Result<bool, PermissionError> {
        self.requires_permission(object, &object.runtime_class(), PermissionLevel::Inspect)?;
        Ok(true)
    }

    pub fn mutates(&self, object: &ObjectRef) -> Result<bool, PermissionError> {
        self.requires_permission(object, &object.runtime_class(), PermissionLevel::Mutate)?;
        Ok(true)
    }

    pub fn inspects_all(
        &self,
        objects: impl IntoIterator<Item = ObjectRef>,
    ) -> Result<bool, PermissionError> {
        for object in objects {
            self.inspects(&object)?;
        }
        Ok(true)
    }

    pub fn mutates_all(
        &self,
        objects: impl IntoIterator<Item = ObjectRef>,
    ) -> Result<bool, PermissionError> {
        for object in objects {
            self.mutates(&object)?;
        }
        Ok(true)
    }
}

struct PermissionWalk<'a> {
    registry: &'a EffectRegistry,
    current: &'a PermissionFrame,
    enclosing: Option<&'a PermissionFrame>,
    level: PermissionLevel,
    /// `(object, class)` pairs already granted during this walk.
    processed: HashSet<(usize, usize)>,
}

impl PermissionWalk<'_> {
    fn peer_group(
        &mut self,
        object: &ObjectRef,
        class: &ClassTag,
        visited: &mut HashSet<usize>,
    ) -> Result<(), PermissionError> {
        self.class_chain(object, class)?;
        visited.insert(address(object));
        if let Some(info) = self.registry.class_info(class) {
            for peer in info.peer_objects(object) {
                if !visited.contains(&address(&peer)) {
                    let peer_class = peer.runtime_class();
                    self.peer_group(&peer, &peer_class, visited)?;
                }
            }
        }
        Ok(())
    }

    fn class_chain(&mut self, object: &ObjectRef, class: &ClassTag) -> Result<(), PermissionError> {
        if class.is_root() {
            return Ok(());
        }
        if !self
            .processed
            .insert((address(object), address(class.as_arc())))
        {
            return Ok(());
        }
        if let Some(enclosing) = self.enclosing {
            enclosing.assert_permission(object, class, self.level)?;
        }
        self.current.grant(object, class, self.level);

        if let Some(superclass) = class.superclass() {
            self.class_chain(object, superclass)?;
        }
        if let Some(info) = self.registry.class_info(class) {
            for rep in info.representation_objects(object) {
                let rep_class = rep.runtime_class();
                self.peer_group(&rep, &rep_class, &mut HashSet::new())?;
            }
        }
        Ok(())
    }
}

/// Scoped frame: pops itself (merging into the enclosing frame) when dropped.
pub struct FrameGuard<'a> {
    ctx: &'a mut VerificationContext,
    id: FrameId,
}

impl FrameGuard<'_> {
    pub fn id(&self) -> FrameId {
        self.id
    }
}

impl Deref for FrameGuard<'_> {
    type Target = VerificationContext;

    fn deref(&self) -> &VerificationContext {
        self.ctx
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut VerificationContext {
        self.ctx
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.ctx.pop_frame(self.id) {
            warn!(frame = self.id.0, "frame guard could not pop its frame: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Tracked;
    use std::any::Any;

    struct Probe(ClassTag);

    impl Tracked for Probe {
        fn runtime_class(&self) -> ClassTag {
            self.0.clone()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn shape_class() -> ClassTag {
        ClassTag::new("Shape", &ClassTag::root("Object"))
    }

    #[test]
    fn no_frame_is_noop() {
        let ctx = VerificationContext::new(Arc::new(EffectRegistry::new()));
        let obj: ObjectRef = Arc::new(Probe(shape_class()));
        ctx.assert_can_inspect(&obj).unwrap();
        ctx.assert_can_mutate(&obj).unwrap();
        ctx.assert_can_create(&obj);
        assert_eq!(
            ctx.inspects(&obj).unwrap_err(),
            PermissionError::NoActiveFrame
        );
    }

    #[test]
    fn pop_requires_top() {
        let mut ctx = VerificationContext::new(Arc::new(EffectRegistry::new()));
        let outer = ctx.push_frame();
        let inner = ctx.push_frame();
        let err = ctx.pop_frame(outer).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot pop a specification frame that is not the top frame."
        );
        ctx.pop_frame(inner).unwrap();
        ctx.pop_frame(outer).unwrap();
        assert!(!ctx.is_active());
    }

    #[test]
    fn guard_pops_and_merges() {
        let mut ctx = VerificationContext::new(Arc::new(EffectRegistry::new()));
        let obj: ObjectRef = Arc::new(Probe(shape_class()));
        let outer = ctx.push_frame();
        {
            let guard = ctx.enter();
            assert_eq!(guard.depth(), 2);
            guard.assert_can_create(&obj);
            guard.assert_can_mutate(&obj).unwrap();
        }
        assert_eq!(ctx.depth(), 1);
        ctx.assert_can_mutate(&obj).unwrap();
        ctx.pop_frame(outer).unwrap();
    }

    #[test]
    fn created_once_grants_once() {
        let mut ctx = VerificationContext::new(Arc::new(EffectRegistry::new()));
        let obj: ObjectRef = Arc::new(Probe(shape_class()));
        let first = ctx.push_frame();
        ctx.assert_can_create(&obj);
        ctx.assert_can_mutate(&obj).unwrap();
        let second = ctx.push_frame();
        ctx.assert_can_create(&obj);
        assert!(ctx.assert_can_inspect(&obj).is_err());
        ctx.pop_frame(second).unwrap();
        ctx.pop_frame(first).unwrap();
    }
}
