//! Single-slot accelerator residency manager.
//!
//! The device has enough memory for one pipeline's working set, so
//! residency is binary: [`ResidencyManager`] owns both pipeline slots,
//! constructs each kind lazily at most once, and guarantees that at most
//! one kind is accelerator-resident at any instant. Swapping is cheap next
//! to construction, so the manager's whole job is construct-once,
//! evict-before-load, and never leave the state inconsistent after a
//! failure.
//!
//! Every acquisition and release runs under one mutex. The guard returned
//! by [`ResidencyManager::acquire`] keeps that mutex held, so a pipeline
//! can never be evicted while a request is still executing on it -- the
//! service is single-generation-at-a-time, true to the single-accelerator
//! constraint.

use tokio::sync::{Mutex, MutexGuard};

use crate::error::EngineError;
use crate::pipeline::{Pipeline, PipelineFactory, PipelineKind, Placement};

/// Owns the two pipeline slots and the active-kind marker.
pub struct ResidencyManager {
    factory: Box<dyn PipelineFactory>,
    state: Mutex<ResidencyState>,
}

/// Invariant: if `active == Some(k)`, the slot for `k` is constructed and
/// device-placed, and the other slot (if constructed) is host-placed.
#[derive(Default)]
struct ResidencyState {
    active: Option<PipelineKind>,
    image: Option<Box<dyn Pipeline>>,
    video: Option<Box<dyn Pipeline>>,
}

impl ResidencyState {
    fn slot(&self, kind: PipelineKind) -> &Option<Box<dyn Pipeline>> {
        match kind {
            PipelineKind::Image => &self.image,
            PipelineKind::Video => &self.video,
        }
    }

    fn slot_mut(&mut self, kind: PipelineKind) -> &mut Option<Box<dyn Pipeline>> {
        match kind {
            PipelineKind::Image => &mut self.image,
            PipelineKind::Video => &mut self.video,
        }
    }

    /// Move `kind` (if constructed) to host placement and clear `active`.
    ///
    /// `active` is cleared before the placement call so the state never
    /// claims device residency for weights that are on their way out.
    async fn offload(&mut self, kind: PipelineKind) -> Result<(), EngineError> {
        self.active = None;
        if let Some(pipeline) = self.slot_mut(kind).as_mut() {
            pipeline
                .place(Placement::Host)
                .await
                .map_err(|e| EngineError::GenerationFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// Point-in-time view of residency for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidencySnapshot {
    pub active: Option<PipelineKind>,
    pub image_constructed: bool,
    pub video_constructed: bool,
}

/// Exclusive lease on the resident pipeline.
///
/// Holds the manager's lock for its lifetime: while a guard exists no other
/// request can acquire, evict, or release. Drop it before calling
/// [`ResidencyManager::release_all`].
pub struct ResidencyGuard<'a> {
    state: MutexGuard<'a, ResidencyState>,
    kind: PipelineKind,
}

impl ResidencyGuard<'_> {
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.state
            .slot(self.kind)
            .as_deref()
            .expect("acquired slot is constructed")
    }
}

impl ResidencyManager {
    pub fn new(factory: Box<dyn PipelineFactory>) -> Self {
        Self {
            factory,
            state: Mutex::new(ResidencyState::default()),
        }
    }

    /// Return a ready, accelerator-resident pipeline for `kind`.
    ///
    /// Fast path: if `kind` is already active, returns immediately with no
    /// eviction and no construction. Otherwise the other kind (if active)
    /// is evicted *first* -- both working sets cannot coexist on-device --
    /// then `kind` is constructed if this is its first use, placed on the
    /// device, and marked active.
    ///
    /// On a construction failure the slot stays unconstructed so a later
    /// request can retry. On a placement failure the weights are rolled
    /// back to host and nothing is left marked active.
    pub async fn acquire(
        &self,
        kind: PipelineKind,
    ) -> Result<ResidencyGuard<'_>, EngineError> {
        let mut state = self.state.lock().await;

        if state.active == Some(kind) && state.slot(kind).is_some() {
            return Ok(ResidencyGuard { state, kind });
        }

        if let Some(other) = state.active {
            tracing::info!(
                evicting = other.label(),
                loading = kind.label(),
                "Swapping pipelines on accelerator"
            );
            state.offload(other).await?;
        }

        if state.slot(kind).is_none() {
            tracing::info!(kind = kind.label(), "Constructing pipeline (first use)");
            let pipeline = self
                .factory
                .build(kind)
                .await
                .map_err(|e| EngineError::Construction(e.to_string()))?;
            *state.slot_mut(kind) = Some(pipeline);
        }

        let placed = state
            .slot_mut(kind)
            .as_mut()
            .expect("slot constructed above")
            .place(Placement::Device)
            .await;

        if let Err(error) = placed {
            // Roll the weights back off-device so the state stays
            // consistent; the caller gets the typed failure.
            if let Err(evict_error) = state.offload(kind).await {
                tracing::error!(error = %evict_error, "Rollback eviction failed");
            }
            return Err(match error {
                crate::error::PipelineError::OutOfMemory => EngineError::ResourceExhausted,
                crate::error::PipelineError::Failed(msg) => EngineError::GenerationFailed(msg),
            });
        }

        state.active = Some(kind);
        Ok(ResidencyGuard { state, kind })
    }

    /// Force the accelerator empty. Idempotent: a no-op when nothing is
    /// active. This is the recovery action after an out-of-memory failure.
    pub async fn release_all(&self) {
        let mut state = self.state.lock().await;
        if let Some(active) = state.active {
            tracing::warn!(kind = active.label(), "Force-evicting resident pipeline");
            if let Err(error) = state.offload(active).await {
                tracing::error!(%error, "Eviction failed while releasing accelerator memory");
            }
        }
    }

    /// Residency view for health reporting.
    pub async fn snapshot(&self) -> ResidencySnapshot {
        let state = self.state.lock().await;
        ResidencySnapshot {
            active: state.active,
            image_constructed: state.image.is_some(),
            video_constructed: state.video.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
