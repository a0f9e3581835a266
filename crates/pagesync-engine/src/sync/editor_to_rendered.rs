//! Outbound direction: position the rendered view from the editor's active
//! anchor.

use std::sync::{Arc, Weak};

use tokio::time::Instant;

use crate::sync::guards::ScrollView;
use crate::sync::mode::SyncMode;
use crate::sync::session::SessionShared;

/// Where in the viewport the target anchor lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Anchor at roughly a third of the viewport down, matching where the
    /// eye rests while editing. Used for follow-along sync.
    Biased,
    /// Anchor dead center. Used for explicit navigation actions.
    Centered,
}

/// Debounce and schedule an outbound sync pass, collapsing bursts to the
/// trailing trigger.
///
/// The delay depends on what the user is doing: typing gets the long window,
/// two-way mode the short one, idle cursor movement the default.
pub(crate) fn schedule_sync(shared: &Arc<SessionShared>) {
    let mut st = shared.state.lock();
    let now = Instant::now();
    let delay = if st.mode == SyncMode::TwoWay {
        shared.tuning.two_way_debounce()
    } else if st.guards.typing_active(now) {
        shared.tuning.debounce_typing()
    } else {
        shared.tuning.debounce_idle()
    };

    let weak: Weak<SessionShared> = Arc::downgrade(shared);
    st.outbound_task.schedule(delay, async move {
        if let Some(shared) = weak.upgrade() {
            sync_now(&shared, Placement::Biased, false);
        }
    });
}

/// Schedule the post-compile resync that follows layout settling.
///
/// Fired after a compile result is installed or after geometry changes, once
/// rasterization has had the settle window to update page metrics.
pub(crate) fn schedule_resync(shared: &Arc<SessionShared>) {
    let mut st = shared.state.lock();
    if !st.startup_synced || st.manually_positioned {
        return;
    }
    let delay = shared.tuning.rasterize_settle();
    let weak: Weak<SessionShared> = Arc::downgrade(shared);
    st.resync_task.schedule(delay, async move {
        if let Some(shared) = weak.upgrade() {
            sync_now(&shared, Placement::Biased, false);
        }
    });
}

/// Run one outbound sync pass immediately.
///
/// `forced` bypasses the mode's direction gate and the manual-position
/// pause; it is the path behind explicit navigation actions. Guards are
/// never bypassed.
pub(crate) fn sync_now(shared: &Arc<SessionShared>, placement: Placement, forced: bool) {
    // Read collaborator geometry before taking the lock; surface calls must
    // never happen under it.
    let viewport_height = shared.rendered.viewport_height();

    let target = {
        let mut st = shared.state.lock();
        let now = Instant::now();

        if !forced {
            if !st.mode.editor_drives_rendered() {
                return;
            }
            if st.manually_positioned {
                log::trace!("outbound sync paused: preview manually positioned");
                return;
            }
        }

        let offsets_ready = st.offsets.is_ready();
        if let Err(rejection) = st.guards.check_outbound(now, offsets_ready, &shared.tuning) {
            log::trace!("outbound sync suppressed: {rejection}");
            return;
        }

        let Some(anchor_id) = st.active_anchor.clone() else {
            return;
        };
        let Some(offset) = st.offsets.offset_of(&anchor_id) else {
            log::trace!("anchor {anchor_id} has no offset yet");
            return;
        };

        let lead = match placement {
            Placement::Biased => viewport_height / 3.0,
            Placement::Centered => viewport_height / 2.0,
        };
        let target = (offset - lead).max(0.0);

        st.guards
            .note_programmatic_scroll(ScrollView::Rendered, now, &shared.tuning);
        target
    };

    log::trace!("outbound sync: scrolling rendered view to {target:.1}px");
    shared.rendered.scroll_to(target);
}
