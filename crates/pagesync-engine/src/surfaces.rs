use crate::render::ArtifactHandle;

/// The text-editing collaborator, seen only through its scroll primitive.
///
/// Cursor, selection, and content-change notifications flow the other way,
/// as calls into the session.
pub trait EditorSurface: Send + Sync {
    /// Scroll the source view so `line` is in view.
    fn scroll_to_line(&self, line: u32);
}

/// The paginated-artifact viewer collaborator.
///
/// The engine never touches rasterization internals; it only reads and
/// writes the scroll position of the viewer's container and asks it to load
/// artifacts.
pub trait RenderedSurface: Send + Sync {
    /// Swap the displayed artifact, returning its page count.
    fn load_artifact(&self, artifact: &ArtifactHandle) -> u32;

    /// Programmatically scroll the container to an absolute pixel offset.
    fn scroll_to(&self, offset: f64);

    fn scroll_top(&self) -> f64;

    fn viewport_height(&self) -> f64;
}
