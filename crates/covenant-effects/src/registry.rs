//! Process-wide bookkeeping shared by every verification context.

use std::sync::{Arc, LazyLock, OnceLock};

use tracing::{debug, warn};

use crate::class_info::ClassInfo;
use crate::error::PermissionError;
use crate::object::{ClassTag, ObjectRef, RuntimeClass, Tracked};
use crate::reclaimer::{Reclaimer, ReclaimerConfig};
use crate::weak_map::{Sweep, WeakIdentityMap, WeakStore};

type CreatedClasses = Arc<WeakIdentityMap<RuntimeClass, ()>>;

/// Class info registry and created-object set.
///
/// Both maps hold their keys weakly: dropping a class tag or an object makes
/// its entries eligible for reclamation.
#[derive(Default)]
pub struct EffectRegistry {
    class_infos: WeakIdentityMap<RuntimeClass, Arc<ClassInfo>>,
    created: WeakIdentityMap<dyn Tracked, CreatedClasses>,
}

static GLOBAL: LazyLock<Arc<EffectRegistry>> = LazyLock::new(|| Arc::new(EffectRegistry::new()));
static GLOBAL_RECLAIMER: OnceLock<Option<Reclaimer>> = OnceLock::new();

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. The first call starts its reclaimer, which
    /// lives for the rest of the process.
    pub fn global() -> Arc<EffectRegistry> {
        let registry = Arc::clone(&GLOBAL);
        GLOBAL_RECLAIMER.get_or_init(|| {
            let target: Arc<dyn Sweep> = registry.clone();
            match Reclaimer::spawn(Arc::downgrade(&target), ReclaimerConfig::default()) {
                Ok(reclaimer) => Some(reclaimer),
                Err(err) => {
                    warn!("global registry runs without a reclaimer: {}", err);
                    None
                }
            }
        });
        registry
    }

    /// Register the class info of `class`. A class can be registered only once.
    pub fn register_class_info(
        &self,
        class: &ClassTag,
        info: ClassInfo,
    ) -> Result<(), PermissionError> {
        match self.class_infos.put_if_absent(class.as_arc(), Arc::new(info)) {
            None => {
                debug!(class = class.name(), "registered class info");
                Ok(())
            }
            Some(_) => Err(PermissionError::DuplicateClassInfo {
                class: class.name().to_string(),
            }),
        }
    }

    pub fn class_info(&self, class: &ClassTag) -> Option<Arc<ClassInfo>> {
        self.class_infos.get(class.as_arc())
    }

    /// Record `(object, class)` as created. Returns `true` only the first time.
    pub fn mark_created(&self, object: &ObjectRef, class: &ClassTag) -> bool {
        let fresh: CreatedClasses = Arc::new(WeakIdentityMap::new());
        let classes = self
            .created
            .put_if_absent(object, fresh.clone())
            .unwrap_or(fresh);
        classes.put_if_absent(class.as_arc(), ()).is_none()
    }

    /// Number of objects with a created-set entry, including stale ones.
    pub fn created_len(&self) -> usize {
        self.created.len()
    }
}

impl Sweep for EffectRegistry {
    fn sweep(&self) -> usize {
        let mut removed = self.class_infos.purge() + self.created.purge();
        self.created.for_each(&mut |_, classes| removed += classes.purge());
        removed
    }
}
