//! Elapsed time to phase mapping.
//!
//! The scheduler is the only place that knows how far into the transition
//! we are. It is fed wall-clock milliseconds and answers with a
//! [`PhaseSample`]; everything else in the engine reads that sample.

use tracing::info;

use crate::transition::phase::{Phase, PhaseSpec, PhaseTable};

/// Result of one [`PhaseScheduler::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseSample {
    pub phase: Phase,
    /// Index of `phase` in the table.
    pub index: usize,
    /// Position within the phase, always in `[0, 1]`.
    pub progress: f32,
    pub warp_speed: f32,
    pub flash_intensity: f32,
    /// Terminal phase has run its full duration.
    pub should_terminate: bool,
    /// Terminal phase is past the hand-off threshold.
    pub handoff_window: bool,
}

/// The scheduler's view of where the transition is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionState {
    pub phase: Phase,
    /// Effective time at which the current phase began, skips included.
    pub phase_start_ms: f32,
    /// Total time added by skips.
    pub skip_offset_ms: f32,
    /// Last wall-clock elapsed time seen.
    pub elapsed_ms: f32,
    pub warp_speed: f32,
    pub flash_intensity: f32,
}

/// Walks a [`PhaseTable`] in order as time passes.
///
/// Phases never repeat and never go backwards. A skip moves the effective
/// clock forward to the next phase boundary by adding an offset, so callers
/// keep feeding real elapsed time.
///
/// # Example
/// ```
/// use lightjump::{Phase, PhaseScheduler, PhaseTable};
///
/// let mut scheduler = PhaseScheduler::new(PhaseTable::light_speed());
/// let sample = scheduler.advance(2500.0);
/// assert_eq!(sample.phase, Phase::Lightspeed);
/// assert!((sample.progress - 0.125).abs() < 1e-6);
///
/// assert!(scheduler.skip(2500.0));
/// assert_eq!(scheduler.advance(2500.0).phase, Phase::Flash);
/// ```
pub struct PhaseScheduler {
    table: PhaseTable,
    state: TransitionState,
    index: usize,
    /// Lowest index `advance` may report; raised by skips so a skip is never
    /// undone by float rounding at the boundary.
    min_index: usize,
}

impl PhaseScheduler {
    pub fn new(table: PhaseTable) -> Self {
        let first = table.phases().first();
        let phase = first.map_or(Phase::Complete, |spec| spec.phase);
        let warp_speed = first.map_or(1.0, |spec| spec.warp.at(0.0));
        Self {
            table,
            state: TransitionState {
                phase,
                phase_start_ms: 0.0,
                skip_offset_ms: 0.0,
                elapsed_ms: 0.0,
                warp_speed,
                flash_intensity: 0.0,
            },
            index: 0,
            min_index: 0,
        }
    }

    /// Map wall-clock elapsed time to the active phase and its parameters.
    ///
    /// Elapsed time earlier than a previous call is treated as the previous
    /// value, so phases only ever move forward.
    pub fn advance(&mut self, elapsed_ms: f32) -> PhaseSample {
        let elapsed_ms = elapsed_ms.max(self.state.elapsed_ms);
        self.state.elapsed_ms = elapsed_ms;

        let t = elapsed_ms + self.state.skip_offset_ms;
        let last = self.table.len().saturating_sub(1);
        let mut end = 0.0;
        let mut index = last;
        for (i, spec) in self.table.phases().iter().enumerate() {
            end += spec.duration_ms;
            if t < end {
                index = i;
                break;
            }
        }
        let index = index.max(self.min_index).max(self.index).min(last);

        let Some(spec) = self.table.phases().get(index) else {
            return self.empty_sample();
        };
        let start = self.table.start_of(index);
        let progress = ((t - start) / spec.duration_ms).clamp(0.0, 1.0);

        if index != self.index || self.state.phase != spec.phase {
            info!(
                phase = %spec.phase,
                from = %self.state.phase,
                elapsed_ms,
                "phase change"
            );
        }
        self.index = index;

        let warp_speed = spec.warp.at(progress);
        let flash_intensity = spec.flash.at(progress);
        let terminal = index == last;

        self.state.phase = spec.phase;
        self.state.phase_start_ms = start;
        self.state.warp_speed = warp_speed;
        self.state.flash_intensity = flash_intensity;

        PhaseSample {
            phase: spec.phase,
            index,
            progress,
            warp_speed,
            flash_intensity,
            should_terminate: terminal && progress >= 1.0,
            handoff_window: terminal && progress > self.table.handoff_after(),
        }
    }

    /// Jump to the start of the next phase if the current one allows it.
    ///
    /// Wall-clock time is untouched: the jump is recorded as an offset added
    /// to every later `advance`. Returns whether the skip was applied.
    pub fn skip(&mut self, elapsed_ms: f32) -> bool {
        let next = self.index + 1;
        if next >= self.table.len() || !self.table.phases()[self.index].skippable {
            return false;
        }
        let elapsed_ms = elapsed_ms.max(self.state.elapsed_ms);
        let t = elapsed_ms + self.state.skip_offset_ms;
        let boundary = self.table.start_of(next);
        if boundary > t {
            self.state.skip_offset_ms += boundary - t;
        }
        self.min_index = next;
        info!(
            from = %self.state.phase,
            to = %self.table.phases()[next].phase,
            elapsed_ms,
            "skip"
        );
        true
    }

    /// Snapshot of the last `advance`.
    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    /// Spec of the phase the last `advance` landed in.
    pub fn current(&self) -> Option<&PhaseSpec> {
        self.table.phases().get(self.index)
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    fn empty_sample(&self) -> PhaseSample {
        PhaseSample {
            phase: self.state.phase,
            index: 0,
            progress: 1.0,
            warp_speed: self.state.warp_speed,
            flash_intensity: 0.0,
            should_terminate: true,
            handoff_window: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_speed() -> PhaseScheduler {
        PhaseScheduler::new(PhaseTable::light_speed())
    }

    #[test]
    fn lightspeed_at_2500ms() {
        let sample = light_speed().advance(2500.0);
        assert_eq!(sample.phase, Phase::Lightspeed);
        assert!((sample.progress - 0.125).abs() < 1e-6);
        assert!((sample.warp_speed - 6.875).abs() < 1e-5);
        assert_eq!(sample.flash_intensity, 0.0);
    }

    #[test]
    fn boundaries_belong_to_the_later_phase() {
        let mut scheduler = light_speed();
        assert_eq!(scheduler.advance(0.0).phase, Phase::Acceleration);
        let at_boundary = scheduler.advance(2000.0);
        assert_eq!(at_boundary.phase, Phase::Lightspeed);
        assert_eq!(at_boundary.progress, 0.0);
    }

    #[test]
    fn flash_peaks_mid_phase() {
        let sample = light_speed().advance(6500.0);
        assert_eq!(sample.phase, Phase::Flash);
        assert!((sample.flash_intensity - 0.8).abs() < 1e-5);
        assert!((sample.warp_speed - 35.0).abs() < 1e-4);
    }

    #[test]
    fn terminal_phase_flags() {
        let mut scheduler = light_speed();
        let early = scheduler.advance(7200.0);
        assert_eq!(early.phase, Phase::Arrival);
        assert!(!early.handoff_window);
        assert!(!early.should_terminate);

        let window = scheduler.advance(7400.0);
        assert!(window.handoff_window);
        assert!(!window.should_terminate);

        let done = scheduler.advance(8000.0);
        assert!(done.should_terminate);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.warp_speed, 1.0);

        let after = scheduler.advance(20_000.0);
        assert_eq!(after.phase, Phase::Arrival);
        assert_eq!(after.progress, 1.0);
    }

    #[test]
    fn progress_stays_in_range_and_phases_never_go_back() {
        let mut scheduler = PhaseScheduler::new(PhaseTable::quantum_jump());
        let mut last_index = 0;
        let mut t = 0.0;
        while t < 20_000.0 {
            let sample = scheduler.advance(t);
            assert!((0.0..=1.0).contains(&sample.progress));
            assert!(sample.index >= last_index);
            last_index = sample.index;
            t += 16.6;
        }
        assert_eq!(last_index, 4);
    }

    #[test]
    fn earlier_elapsed_is_ignored() {
        let mut scheduler = light_speed();
        scheduler.advance(3000.0);
        let sample = scheduler.advance(100.0);
        assert_eq!(sample.phase, Phase::Lightspeed);
        assert!((sample.progress - 0.25).abs() < 1e-6);
    }

    #[test]
    fn skip_lands_on_next_boundary() {
        let mut scheduler = light_speed();
        scheduler.advance(500.0);
        assert!(scheduler.skip(500.0));

        let sample = scheduler.advance(500.0);
        assert_eq!(sample.phase, Phase::Lightspeed);
        assert_eq!(sample.progress, 0.0);
        assert_eq!(scheduler.state().elapsed_ms, 500.0);
        assert!((scheduler.state().skip_offset_ms - 1500.0).abs() < 1e-3);

        let later = scheduler.advance(1500.0);
        assert!((later.progress - 0.25).abs() < 1e-6);
    }

    #[test]
    fn skip_visits_every_phase_in_order() {
        let mut scheduler = light_speed();
        let mut seen = vec![scheduler.advance(10.0).phase];
        assert!(scheduler.skip(10.0));
        seen.push(scheduler.advance(10.0).phase);
        assert!(scheduler.skip(10.0));
        seen.push(scheduler.advance(10.0).phase);
        assert_eq!(
            seen,
            vec![Phase::Acceleration, Phase::Lightspeed, Phase::Flash]
        );
    }

    #[test]
    fn skip_refused_outside_skippable_phases() {
        let mut scheduler = light_speed();
        scheduler.advance(6200.0);
        assert!(!scheduler.skip(6200.0));
        scheduler.advance(7500.0);
        assert!(!scheduler.skip(7500.0));
        assert_eq!(scheduler.state().skip_offset_ms, 0.0);
    }

    #[test]
    fn quantum_jump_hands_off_as_soon_as_complete_starts() {
        let mut scheduler = PhaseScheduler::new(PhaseTable::quantum_jump());
        let start = PhaseTable::quantum_jump().start_of(4);
        let entering = scheduler.advance(start);
        assert_eq!(entering.phase, Phase::Complete);
        assert!(!entering.handoff_window);
        assert!(scheduler.advance(start + 1.0).handoff_window);
    }
}
