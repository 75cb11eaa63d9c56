use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;
use crate::level::PermissionLevel;
use crate::object::{ClassTag, ObjectRef, RuntimeClass, Tracked};
use crate::weak_map::{WeakIdentityMap, WeakStore};

/// Identifier of a pushed frame, used to check LIFO discipline on pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// Levels granted on one object, per class of its chain.
#[derive(Clone, Default)]
struct ClassLevels(Vec<(Weak<RuntimeClass>, PermissionLevel)>);

impl ClassLevels {
    fn position(&self, class: &ClassTag) -> Option<usize> {
        let target = Arc::as_ptr(class.as_arc());
        self.0
            .iter()
            .position(|(c, _)| c.strong_count() > 0 && Weak::as_ptr(c) == target)
    }

    fn get(&self, class: &ClassTag) -> PermissionLevel {
        self.position(class)
            .map(|i| self.0[i].1)
            .unwrap_or_default()
    }

    fn raise(&mut self, class: &ClassTag, level: PermissionLevel) {
        match self.position(class) {
            Some(i) => self.0[i].1 = self.0[i].1.max(level),
            None => self.0.push((Arc::downgrade(class.as_arc()), level)),
        }
    }

    fn live(&self) -> impl Iterator<Item = (ClassTag, PermissionLevel)> + '_ {
        self.0
            .iter()
            .filter_map(|(c, l)| c.upgrade().map(|c| (ClassTag::from_arc(c), *l)))
    }
}

/// One permission frame: the grants held by the contract code currently running.
pub struct PermissionFrame {
    id: FrameId,
    permissions: WeakIdentityMap<dyn Tracked, ClassLevels>,
}

impl PermissionFrame {
    pub(crate) fn new(id: FrameId) -> Self {
        PermissionFrame {
            id,
            permissions: WeakIdentityMap::new(),
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn level(&self, object: &ObjectRef, class: &ClassTag) -> PermissionLevel {
        self.permissions
            .get_or_default(object, ClassLevels::default())
            .get(class)
    }

    /// Raise the level held on `(object, class)` to at least `level`.
    pub fn grant(&self, object: &ObjectRef, class: &ClassTag, level: PermissionLevel) {
        self.permissions.update(object, |levels| levels.raise(class, level));
    }

    pub fn assert_permission(
        &self,
        object: &ObjectRef,
        class: &ClassTag,
        level: PermissionLevel,
    ) -> Result<(), PermissionError> {
        if self.level(object, class).is_less_than(level) {
            return Err(PermissionError::insufficient(level, class.name()));
        }
        Ok(())
    }

    /// Copy every grant of this frame into `enclosing`, keeping the maximum.
    pub(crate) fn merge_into(&self, enclosing: &PermissionFrame) {
        self.permissions.for_each(&mut |object, levels| {
            for (class, level) in levels.live() {
                enclosing.grant(&object, &class, level);
            }
        });
    }

    /// Number of objects with at least one grant.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
