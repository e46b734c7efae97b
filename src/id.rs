use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A compiled program owned by a [`Backend`](crate::backend::Backend).
    ProgramId
);
define_id!(
    /// Uploaded fill and stroke buffers of a cached mesh.
    MeshId
);
define_id!(
    /// A sampleable texture owned by a backend.
    TextureId
);
define_id!(
    /// An offscreen render target owned by a backend.
    FramebufferId
);
define_id!(
    /// Identity of a [`Shader`](crate::shader::Shader) value and all its clones.
    ShaderId
);
define_id!(
    /// Identity of an [`Image`](crate::image::Image) value and all its clones.
    ImageId
);

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

impl ShaderId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl ImageId {
    pub(crate) fn next() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Hands out sequential ids for resources owned by one backend instance.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) fn allocate(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}
