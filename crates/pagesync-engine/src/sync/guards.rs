use thiserror::Error;
use tokio::time::Instant;

use pagesync_config::SyncTuning;

/// Why a programmatic scroll was suppressed.
///
/// Guard rejections are an expected, frequent, silent outcome, not errors;
/// they exist so diagnostics can say which predicate fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardRejection {
    #[error("synchronization is disabled")]
    SyncDisabled,
    #[error("view is no longer attached")]
    ViewDetached,
    #[error("anchor offsets not computed yet")]
    OffsetsNotReady,
    #[error("typing in progress or within its cooldown window")]
    Typing,
    #[error("within programmatic scroll cooldown")]
    ProgrammaticScrollCooldown,
    #[error("artifact is still rendering")]
    Rendering,
    #[error("scrolling is locked")]
    ScrollLocked,
    #[error("within mount warm-up window")]
    MountWarmup,
}

/// Which scroll container a cooldown belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollView {
    Editor,
    Rendered,
}

/// The predicates both sync directions consult before touching a scroll
/// position.
///
/// All timestamps use the tokio clock so tests can drive them with a paused
/// runtime. There is no locking here; the owning session already serializes
/// access, and reentrancy (a scroll handler triggering another scroll) is
/// broken by the programmatic-scroll cooldowns rather than by a lock.
#[derive(Debug)]
pub struct GuardState {
    pub(crate) sync_enabled: bool,
    pub(crate) attached: bool,
    pub(crate) typing: bool,
    pub(crate) typing_cooldown_until: Option<Instant>,
    pub(crate) editor_cooldown_until: Option<Instant>,
    pub(crate) rendered_cooldown_until: Option<Instant>,
    pub(crate) rendering: bool,
    pub(crate) scroll_locked: bool,
    pub(crate) mounted_at: Instant,
}

impl GuardState {
    pub fn new(now: Instant) -> Self {
        Self {
            sync_enabled: true,
            attached: true,
            typing: false,
            typing_cooldown_until: None,
            editor_cooldown_until: None,
            rendered_cooldown_until: None,
            rendering: false,
            scroll_locked: false,
            mounted_at: now,
        }
    }

    pub fn typing_started(&mut self) {
        self.typing = true;
    }

    pub fn typing_stopped(&mut self, now: Instant, tuning: &SyncTuning) {
        self.typing = false;
        self.typing_cooldown_until = Some(now + tuning.typing_cooldown());
    }

    /// Typing is "active" while keys are going down and for the stabilization
    /// window after the last one.
    pub fn typing_active(&self, now: Instant) -> bool {
        self.typing || self.typing_cooldown_until.is_some_and(|until| now < until)
    }

    /// Record that the engine itself is about to scroll `view`, so the echo
    /// of that scroll is not mistaken for user input.
    ///
    /// A newer programmatic scroll simply overwrites the window; cooldowns
    /// never queue.
    pub fn note_programmatic_scroll(&mut self, view: ScrollView, now: Instant, tuning: &SyncTuning) {
        let until = now + tuning.scroll_cooldown();
        match view {
            ScrollView::Editor => self.editor_cooldown_until = Some(until),
            ScrollView::Rendered => self.rendered_cooldown_until = Some(until),
        }
    }

    pub fn in_programmatic_cooldown(&self, view: ScrollView, now: Instant) -> bool {
        let until = match view {
            ScrollView::Editor => self.editor_cooldown_until,
            ScrollView::Rendered => self.rendered_cooldown_until,
        };
        until.is_some_and(|until| now < until)
    }

    pub fn past_mount_warmup(&self, now: Instant, tuning: &SyncTuning) -> bool {
        now >= self.mounted_at + tuning.mount_warmup()
    }

    /// Guards for the editor-to-rendered direction, checked in order; the
    /// first failure wins.
    pub fn check_outbound(
        &self,
        now: Instant,
        offsets_ready: bool,
        _tuning: &SyncTuning,
    ) -> Result<(), GuardRejection> {
        if !self.sync_enabled {
            return Err(GuardRejection::SyncDisabled);
        }
        if !self.attached {
            return Err(GuardRejection::ViewDetached);
        }
        if !offsets_ready {
            return Err(GuardRejection::OffsetsNotReady);
        }
        if self.typing_active(now) {
            return Err(GuardRejection::Typing);
        }
        if self.rendering {
            return Err(GuardRejection::Rendering);
        }
        if self.scroll_locked {
            return Err(GuardRejection::ScrollLocked);
        }
        Ok(())
    }

    /// Guards for driving the editor from the rendered view. Same list as
    /// outbound plus the editor-side programmatic cooldown, since the editor
    /// is the view being scrolled here.
    pub fn check_inbound(
        &self,
        now: Instant,
        offsets_ready: bool,
        _tuning: &SyncTuning,
    ) -> Result<(), GuardRejection> {
        self.check_outbound(now, offsets_ready, _tuning)?;
        if self.in_programmatic_cooldown(ScrollView::Editor, now) {
            return Err(GuardRejection::ProgrammaticScrollCooldown);
        }
        Ok(())
    }

    /// Decide whether an observed scroll event on the rendered view counts
    /// as user input at all.
    pub fn classify_rendered_scroll(
        &self,
        now: Instant,
        tuning: &SyncTuning,
    ) -> Result<(), GuardRejection> {
        if !self.past_mount_warmup(now, tuning) {
            return Err(GuardRejection::MountWarmup);
        }
        if self.in_programmatic_cooldown(ScrollView::Rendered, now) {
            return Err(GuardRejection::ProgrammaticScrollCooldown);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tuning() -> SyncTuning {
        SyncTuning::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_clear_permits_scroll() {
        let now = Instant::now();
        let guards = GuardState::new(now);

        assert_eq!(guards.check_outbound(now, true, &tuning()), Ok(()));
        assert_eq!(guards.check_inbound(now, true, &tuning()), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failing_guard_wins() {
        let now = Instant::now();
        let mut guards = GuardState::new(now);
        guards.sync_enabled = false;
        guards.typing = true;

        // Disabled outranks typing in the check order.
        assert_eq!(
            guards.check_outbound(now, false, &tuning()),
            Err(GuardRejection::SyncDisabled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_offsets_reject_as_not_ready() {
        let now = Instant::now();
        let guards = GuardState::new(now);

        assert_eq!(
            guards.check_outbound(now, false, &tuning()),
            Err(GuardRejection::OffsetsNotReady)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_cooldown_lifts_after_window() {
        let tuning = tuning();
        let now = Instant::now();
        let mut guards = GuardState::new(now);

        guards.typing_started();
        assert!(guards.typing_active(now));

        guards.typing_stopped(now, &tuning);
        // Still suppressed during the stabilization window.
        assert!(guards.typing_active(now + Duration::from_millis(1400)));
        assert!(!guards.typing_active(now + Duration::from_millis(1500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_programmatic_cooldown_is_per_view() {
        let tuning = tuning();
        let now = Instant::now();
        let mut guards = GuardState::new(now);

        guards.note_programmatic_scroll(ScrollView::Rendered, now, &tuning);

        assert!(guards.in_programmatic_cooldown(ScrollView::Rendered, now));
        assert!(!guards.in_programmatic_cooldown(ScrollView::Editor, now));
        let after = now + tuning.scroll_cooldown();
        assert!(!guards.in_programmatic_cooldown(ScrollView::Rendered, after));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_programmatic_scroll_overwrites_cooldown() {
        let tuning = tuning();
        let now = Instant::now();
        let mut guards = GuardState::new(now);

        guards.note_programmatic_scroll(ScrollView::Rendered, now, &tuning);
        let later = now + Duration::from_millis(150);
        guards.note_programmatic_scroll(ScrollView::Rendered, later, &tuning);

        // The window restarts from the second scroll rather than queueing.
        assert!(guards.in_programmatic_cooldown(ScrollView::Rendered, now + tuning.scroll_cooldown()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_during_mount_warmup_is_not_user_input() {
        let tuning = tuning();
        let now = Instant::now();
        let guards = GuardState::new(now);

        assert_eq!(
            guards.classify_rendered_scroll(now, &tuning),
            Err(GuardRejection::MountWarmup)
        );
        assert_eq!(
            guards.classify_rendered_scroll(now + tuning.mount_warmup(), &tuning),
            Ok(())
        );
    }
}
