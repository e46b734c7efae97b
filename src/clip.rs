//! Stencil-backed clipping tied to the state stack.
//!
//! `begin_clip` starts writing a mask into the stencil buffer of the current target; `end_clip`
//! switches to testing against it and remembers the stack depth it belongs to. Popping the state
//! stack past that depth retires the mask.

use crate::backend::{StencilCompare, StencilMode, TargetId};
use crate::error::{RenderError, Result};
use ahash::{HashMap, HashMapExt};
use smallvec::SmallVec;
use tracing::debug;

/// Value written into the stencil buffer where mask geometry lands.
pub const MASK_REFERENCE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipOptions {
    /// Keep what lies outside the mask instead of inside.
    pub invert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPhase {
    Unclipped,
    /// Mask geometry is being drawn.
    Clipping,
    Clipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClipMask {
    invert: bool,
}

#[derive(Debug)]
pub struct ClipState {
    clipping: Option<(TargetId, ClipOptions)>,
    depths: SmallVec<[usize; 4]>,
    masks: HashMap<TargetId, ClipMask>,
}

impl Default for ClipState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipState {
    pub fn new() -> Self {
        Self {
            clipping: None,
            depths: SmallVec::new(),
            masks: HashMap::new(),
        }
    }

    pub fn phase(&self, target: TargetId) -> ClipPhase {
        match self.clipping {
            Some((clipping_target, _)) if clipping_target == target => ClipPhase::Clipping,
            _ if self.masks.contains_key(&target) => ClipPhase::Clipped,
            _ => ClipPhase::Unclipped,
        }
    }

    pub fn is_clipping(&self) -> bool {
        self.clipping.is_some()
    }

    /// Starts a mask on `target`. The caller clears the target's stencil buffer.
    pub fn begin(&mut self, target: TargetId, options: ClipOptions) -> Result<()> {
        if self.clipping.is_some() {
            return Err(RenderError::ClipAlreadyStarted);
        }
        debug!("Begin clip on {:?} (invert: {})", target, options.invert);
        self.masks.remove(&target);
        self.clipping = Some((target, options));
        Ok(())
    }

    /// Activates the mask being drawn; `depth` is the state stack depth it belongs to.
    pub fn end(&mut self, depth: usize) -> Result<()> {
        let (target, options) = self.clipping.take().ok_or(RenderError::ClipNotStarted)?;
        self.masks.insert(
            target,
            ClipMask {
                invert: options.invert,
            },
        );
        self.depths.push(depth);
        Ok(())
    }

    /// Called on every pop with the depth being left. Returns `true` when the mask of `target`
    /// was retired and its stencil buffer must be cleared.
    pub fn on_pop(&mut self, target: TargetId, depth_left: usize) -> bool {
        if self.depths.last() != Some(&depth_left) {
            return false;
        }
        self.depths.pop();
        self.masks.remove(&target).is_some()
    }

    /// Stencil configuration for draws into `target`.
    pub fn stencil_mode(&self, target: TargetId) -> StencilMode {
        if let Some((clipping_target, _)) = self.clipping {
            if clipping_target == target {
                return StencilMode::Write {
                    reference: MASK_REFERENCE,
                };
            }
        }
        match self.masks.get(&target) {
            Some(mask) => StencilMode::Test {
                compare: if mask.invert {
                    StencilCompare::Equal
                } else {
                    StencilCompare::NotEqual
                },
                reference: 0,
            },
            None => StencilMode::Disabled,
        }
    }

    pub fn reset(&mut self) {
        self.clipping = None;
        self.depths.clear();
        self.masks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::FramebufferId;

    #[test]
    fn mask_is_written_then_tested() {
        let mut clip = ClipState::new();
        clip.begin(TargetId::Main, ClipOptions::default()).unwrap();
        assert_eq!(clip.phase(TargetId::Main), ClipPhase::Clipping);
        assert_eq!(
            clip.stencil_mode(TargetId::Main),
            StencilMode::Write { reference: 1 }
        );

        clip.end(0).unwrap();
        assert_eq!(clip.phase(TargetId::Main), ClipPhase::Clipped);
        assert_eq!(
            clip.stencil_mode(TargetId::Main),
            StencilMode::Test {
                compare: StencilCompare::NotEqual,
                reference: 0
            }
        );
    }

    #[test]
    fn inverted_mask_keeps_the_outside() {
        let mut clip = ClipState::new();
        clip.begin(TargetId::Main, ClipOptions { invert: true }).unwrap();
        clip.end(0).unwrap();
        assert_eq!(
            clip.stencil_mode(TargetId::Main),
            StencilMode::Test {
                compare: StencilCompare::Equal,
                reference: 0
            }
        );
    }

    #[test]
    fn popping_past_the_clip_depth_retires_the_mask() {
        let mut clip = ClipState::new();
        // push() to depth 1, then clip there.
        clip.begin(TargetId::Main, ClipOptions::default()).unwrap();
        clip.end(1).unwrap();

        // A nested push/pop leaves depth 2 and keeps the mask.
        assert!(!clip.on_pop(TargetId::Main, 2));
        assert_eq!(clip.phase(TargetId::Main), ClipPhase::Clipped);

        assert!(clip.on_pop(TargetId::Main, 1));
        assert_eq!(clip.phase(TargetId::Main), ClipPhase::Unclipped);
        assert_eq!(clip.stencil_mode(TargetId::Main), StencilMode::Disabled);
    }

    #[test]
    fn masks_are_tracked_per_target() {
        let mut clip = ClipState::new();
        let framebuffer = TargetId::Framebuffer(FramebufferId(7));
        clip.begin(framebuffer, ClipOptions::default()).unwrap();
        clip.end(0).unwrap();
        assert_eq!(clip.stencil_mode(TargetId::Main), StencilMode::Disabled);
        assert_ne!(clip.stencil_mode(framebuffer), StencilMode::Disabled);
    }

    #[test]
    fn end_without_begin_and_nested_begin_fail() {
        let mut clip = ClipState::new();
        assert_eq!(clip.end(0), Err(RenderError::ClipNotStarted));
        clip.begin(TargetId::Main, ClipOptions::default()).unwrap();
        assert_eq!(
            clip.begin(TargetId::Main, ClipOptions::default()),
            Err(RenderError::ClipAlreadyStarted)
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut clip = ClipState::new();
        clip.begin(TargetId::Main, ClipOptions::default()).unwrap();
        clip.end(0).unwrap();
        clip.reset();
        assert_eq!(clip.phase(TargetId::Main), ClipPhase::Unclipped);
        assert!(!clip.on_pop(TargetId::Main, 0));
    }
}
