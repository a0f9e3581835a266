//! Glue between the render queue, the progressive renderer, and the sync
//! session for one open document.

use std::sync::Arc;

use parking_lot::Mutex;

use pagesync_config::SyncTuning;

use crate::error::SyncError;
use crate::models::PageMetrics;
use crate::render::{Compiled, Compiler, PageRasterizer, ProgressiveRenderer, RenderQueue};
use crate::surfaces::{EditorSurface, RenderedSurface};
use crate::sync::SyncSession;

struct PipelineInner {
    queue: RenderQueue,
    session: SyncSession,
    rasterizer: Arc<dyn PageRasterizer>,
    rendered: Arc<dyn RenderedSurface>,
    tuning: SyncTuning,
    /// Renderer for the artifact currently displayed. Replaced (and the old
    /// one cancelled) each time a newer compile result is installed.
    renderer: Mutex<Option<Arc<ProgressiveRenderer>>>,
}

/// Everything a host needs per open document: a compile entry point, the
/// event intake from both views, and the session handle for user controls.
#[derive(Clone)]
pub struct DocumentPipeline {
    inner: Arc<PipelineInner>,
}

impl DocumentPipeline {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        rasterizer: Arc<dyn PageRasterizer>,
        editor: Arc<dyn EditorSurface>,
        rendered: Arc<dyn RenderedSurface>,
        tuning: SyncTuning,
    ) -> Self {
        let session = SyncSession::new(editor, Arc::clone(&rendered), tuning.clone());
        Self {
            inner: Arc::new(PipelineInner {
                queue: RenderQueue::new(compiler),
                session,
                rasterizer,
                rendered,
                tuning,
                renderer: Mutex::new(None),
            }),
        }
    }

    pub fn session(&self) -> &SyncSession {
        &self.inner.session
    }

    /// Fire-and-forget intake for content edits. Failures land in the
    /// session's error state rather than surfacing to the caller.
    pub fn content_changed(&self, content: String) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(err) = pipeline.compile_now(content).await {
                log::debug!("background compile not installed: {err}");
            }
        });
    }

    /// Compile `content` and install the result once it lands.
    ///
    /// Coalesced by the render queue: concurrent callers share the trailing
    /// compile's outcome. Returns [`SyncError::Stale`] when a newer result
    /// was installed first.
    pub async fn compile_now(&self, content: String) -> Result<(), SyncError> {
        let ticket = self.inner.queue.submit(content);
        match ticket.wait().await {
            Ok(compiled) => self.install(compiled),
            Err(err) => {
                self.inner.session.compile_failed(err.clone());
                Err(SyncError::CompileFailed(err))
            }
        }
    }

    /// Swap the displayed artifact for a fresh compile result and kick off
    /// progressive rasterization.
    fn install(&self, compiled: Compiled) -> Result<(), SyncError> {
        if !self.inner.session.apply_compile(&compiled) {
            return Err(SyncError::Stale);
        }

        let renderer = Arc::new(ProgressiveRenderer::new(
            Arc::clone(&self.inner.rasterizer),
            self.inner.tuning.clone(),
        ));
        let page_count = self.inner.rendered.load_artifact(&compiled.output.artifact);
        renderer.prepare(page_count);

        {
            let mut slot = self.inner.renderer.lock();
            if let Some(old) = slot.replace(Arc::clone(&renderer)) {
                old.cancel();
            }
        }

        self.inner.session.set_rendering(true);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let scroll_top = inner.rendered.scroll_top();
            let viewport_height = inner.rendered.viewport_height();
            let metrics = inner.session.metrics();
            renderer.run(&metrics, scroll_top, viewport_height).await;
            if !renderer.is_cancelled() {
                inner.session.set_rendering(false);
            }
        });
        Ok(())
    }

    /// Scroll observed on the rendered view: feeds the inbound sync
    /// direction and wakes the lazy rasterization pass for newly visible
    /// pages.
    pub fn preview_scrolled(&self, scroll_top: f64) {
        self.inner.session.rendered_scrolled(scroll_top);

        let renderer = self.inner.renderer.lock().clone();
        if let Some(renderer) = renderer {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                let viewport_height = inner.rendered.viewport_height();
                let metrics = inner.session.metrics();
                renderer.on_scroll(&metrics, scroll_top, viewport_height).await;
            });
        }
    }

    pub fn pages_measured(&self, metrics: PageMetrics) {
        self.inner.session.pages_measured(metrics);
    }

    pub fn rendered_resized(&self) {
        self.inner.session.rendered_resized();
    }

    /// Document closed or view unmounted: cancel in-flight rasterization and
    /// detach the session so stale work becomes a no-op.
    pub fn close(&self) {
        if let Some(renderer) = self.inner.renderer.lock().take() {
            renderer.cancel();
        }
        self.inner.session.close();
    }
}
