/// Which view, if any, is authoritative for scroll position.
///
/// Distinct from the implicit "manually positioned" flag, which only exists
/// inside [`Auto`](SyncMode::Auto) and pauses the outbound direction after a
/// manual preview scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Editor drives the preview unless the user has manually scrolled it.
    #[default]
    Auto,
    /// Continuous bidirectional sync with a lighter debounce.
    TwoWay,
    /// Editor is pinned as authoritative; the preview follows and never
    /// drives the reverse direction.
    LockedToEditor,
    /// Preview is pinned as authoritative; the editor follows.
    LockedToRendered,
}

impl SyncMode {
    pub fn editor_drives_rendered(&self) -> bool {
        matches!(self, SyncMode::Auto | SyncMode::TwoWay | SyncMode::LockedToEditor)
    }

    pub fn rendered_drives_editor(&self) -> bool {
        matches!(self, SyncMode::Auto | SyncMode::TwoWay | SyncMode::LockedToRendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SyncMode::Auto, true, true)]
    #[case(SyncMode::TwoWay, true, true)]
    #[case(SyncMode::LockedToEditor, true, false)]
    #[case(SyncMode::LockedToRendered, false, true)]
    fn test_mode_directions(
        #[case] mode: SyncMode,
        #[case] outbound: bool,
        #[case] inbound: bool,
    ) {
        assert_eq!(mode.editor_drives_rendered(), outbound);
        assert_eq!(mode.rendered_drives_editor(), inbound);
    }
}
