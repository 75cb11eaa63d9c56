//! Effect-permission runtime.
//!
//! Contract code executes inside permission frames. A frame records, per
//! `(object, class)` pair, whether the code may inspect or mutate that part of
//! the object. Frames are pushed and popped on an owned
//! [`VerificationContext`]; popping a frame merges its grants into the
//! enclosing one. Process-wide bookkeeping (class infos and the created-object
//! set) lives in an [`EffectRegistry`] whose weak maps are swept by a
//! background [`Reclaimer`].

pub mod class_info;
pub mod context;
pub mod error;
pub mod frame;
pub mod level;
pub mod object;
pub mod reclaimer;
pub mod registry;
pub mod weak_map;

pub use class_info::{ClassInfo, RelatedObjects};
pub use context::{FrameGuard, VerificationContext};
pub use error::PermissionError;
pub use frame::{FrameId, PermissionFrame};
pub use level::PermissionLevel;
pub use object::{ClassTag, ObjectRef, RuntimeClass, Tracked};
pub use reclaimer::{Reclaimer, ReclaimerConfig};
pub use registry::EffectRegistry;
pub use weak_map::{Sweep, WeakIdentityMap, WeakStore};
