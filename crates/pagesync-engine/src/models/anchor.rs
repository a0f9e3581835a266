use serde::{Deserialize, Serialize};

/// Position in the text source, as reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

/// Position in the paginated artifact: a page number plus a vertical offset
/// expressed as a fraction of that page's height (`0.0..=1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedPosition {
    pub page: u32,
    pub offset_in_page: f64,
}

/// Compiler-issued anchor identifier.
///
/// Ids are opaque and are NOT stable across recompiles: the compiler may
/// regenerate them wholesale for every source map it emits. Position
/// continuity across generations is re-derived by nearest-line matching, see
/// [`SourceMap::nearest_to_line`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub String);

impl AnchorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(s: &str) -> Self {
        AnchorId(s.to_string())
    }
}

/// A linked pair of positions produced by the compiler: where a block sits in
/// the text source and where the same block landed in the paginated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: AnchorId,
    pub source: SourcePosition,
    pub rendered: RenderedPosition,
}

/// Immutable set of anchors for one compiled version of the document.
///
/// Owned by the sync subsystem for exactly the lifetime between two compiles:
/// superseded (never mutated) on every successful compile, and discarded
/// entirely on compile failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    anchors: Vec<Anchor>,
}

impl SourceMap {
    /// Build a source map, ordering anchors by source position.
    pub fn new(mut anchors: Vec<Anchor>) -> Self {
        anchors.sort_by_key(|a| a.source);
        Self { anchors }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn first(&self) -> Option<&Anchor> {
        self.anchors.first()
    }

    pub fn anchor(&self, id: &AnchorId) -> Option<&Anchor> {
        self.anchors.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AnchorId) -> bool {
        self.anchor(id).is_some()
    }

    /// Anchor whose source line is numerically closest to `line`.
    ///
    /// Ties resolve to the earlier anchor. Used to carry the active anchor
    /// across recompiles when its id no longer exists in the new map.
    pub fn nearest_to_line(&self, line: u32) -> Option<&Anchor> {
        self.anchors.iter().min_by_key(|a| {
            let anchor_line = a.source.line;
            anchor_line.abs_diff(line)
        })
    }

    /// Last anchor at or before `line`, falling back to the first anchor.
    ///
    /// This is the cursor-to-anchor mapping: the cursor belongs to the block
    /// that starts at or above it.
    pub fn anchor_at_or_before_line(&self, line: u32) -> Option<&Anchor> {
        self.anchors
            .iter()
            .rev()
            .find(|a| a.source.line <= line)
            .or_else(|| self.anchors.first())
    }
}
