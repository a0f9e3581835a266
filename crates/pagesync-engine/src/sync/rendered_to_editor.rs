//! Inbound direction: position the editor from scrolls observed on the
//! rendered view.

use std::sync::Arc;

use tokio::time::Instant;

use crate::sync::guards::ScrollView;
use crate::sync::mode::SyncMode;
use crate::sync::session::SessionShared;

/// React to an observed scroll on the rendered view.
///
/// The event is first classified: during mount warm-up or a programmatic
/// cooldown it is an echo of our own work and ignored entirely. A genuine
/// user scroll in `Auto` mode pauses outbound sync; when the mode lets the
/// rendered view drive, the editor is scrolled to the anchor nearest the
/// viewport center.
pub(crate) fn handle_rendered_scroll(shared: &Arc<SessionShared>, scroll_top: f64) {
    let viewport_height = shared.rendered.viewport_height();

    let target_line = {
        let mut st = shared.state.lock();
        let now = Instant::now();

        if let Err(rejection) = st.guards.classify_rendered_scroll(now, &shared.tuning) {
            log::trace!("rendered scroll not user input: {rejection}");
            return;
        }

        // A real user scroll of the preview in Auto mode takes over
        // positioning until the editor moves again.
        if st.mode == SyncMode::Auto && !st.manually_positioned {
            log::debug!("manual preview scroll: pausing follow-along sync");
            st.manually_positioned = true;
        }

        if !st.mode.rendered_drives_editor() {
            return;
        }

        let center = scroll_top + viewport_height / 2.0;
        let Some(anchor_id) = st.offsets.nearest_to_offset(center).cloned() else {
            return;
        };
        st.active_anchor = Some(anchor_id.clone());

        let offsets_ready = st.offsets.is_ready();
        if let Err(rejection) = st.guards.check_inbound(now, offsets_ready, &shared.tuning) {
            log::trace!("inbound sync suppressed: {rejection}");
            return;
        }

        let Some(line) = st
            .source_map
            .as_ref()
            .and_then(|map| map.anchor(&anchor_id))
            .map(|anchor| anchor.source.line)
        else {
            return;
        };

        st.guards
            .note_programmatic_scroll(ScrollView::Editor, now, &shared.tuning);
        line
    };

    log::trace!("inbound sync: scrolling editor to line {target_line}");
    shared.editor.scroll_to_line(target_line);
}
