//! ShapeResolver: expands `custom` shapes into their nested layouts.
//!
//! A custom shape points at another layout document by model id.  Expanding
//! it means fetching that document, scaling it into the custom shape's
//! rectangle and expanding *its* custom shapes in turn.  Two things keep this
//! bounded:
//!
//! - **Caching.**  Each model id is looked up at most once per render; misses
//!   are cached too, so a missing shape referenced fifty times costs a single
//!   fetch.
//! - **Cycle protection.**  The ids on the current expansion path are tracked;
//!   a custom shape that refers back to one of them is emitted without
//!   children.
//!
//! Nothing here is fatal: an unresolved reference is logged and the custom
//! shape is kept as plain geometry.

use std::collections::HashMap;
use std::sync::Arc;

use rackview_core::{LayoutDocument, ParseError, RenderFrame, Shape};
use thiserror::Error;

use crate::application::metadata::{FetchError, MetadataService};

/// Why a nested layout could not be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The inventory has no custom shape (or no layout) with this id.
    #[error("no layout found for model {0}")]
    NotFound(String),

    /// The inventory could not be asked.
    #[error("could not fetch layout of model {model_id}: {source}")]
    Unavailable {
        model_id: String,
        #[source]
        source: FetchError,
    },

    /// The nested document does not decode.
    #[error("layout of model {model_id} is corrupted: {source}")]
    Corrupted {
        model_id: String,
        #[source]
        source: ParseError,
    },

    /// The model is already being expanded further up the current path.
    #[error("model {0} contains itself")]
    Cycle(String),
}

/// Resolves and expands layout documents for one render.
pub struct ShapeResolver {
    service: Arc<dyn MetadataService>,
    /// Documents that came embedded in the device-structure document.
    known: HashMap<String, Arc<LayoutDocument>>,
    /// Results of earlier fetches, hits and misses alike.
    cache: HashMap<String, Result<Arc<LayoutDocument>, LookupError>>,
}

impl ShapeResolver {
    /// Creates a resolver that answers from `known` before asking `service`.
    pub fn new(
        service: Arc<dyn MetadataService>,
        known: HashMap<String, Arc<LayoutDocument>>,
    ) -> Self {
        Self {
            service,
            known,
            cache: HashMap::new(),
        }
    }

    /// Returns the layout document of `model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the document cannot be obtained.  The
    /// error is cached: asking again for the same id does not fetch again.
    pub fn lookup(&mut self, model_id: &str) -> Result<Arc<LayoutDocument>, LookupError> {
        if let Some(document) = self.known.get(model_id) {
            return Ok(Arc::clone(document));
        }
        if let Some(cached) = self.cache.get(model_id) {
            return cached.clone();
        }
        let result = self.fetch(model_id);
        self.cache.insert(model_id.to_string(), result.clone());
        result
    }

    /// Like [`lookup`](Self::lookup) but logs the failure and returns `None`.
    pub fn resolve(&mut self, model_id: &str) -> Option<Arc<LayoutDocument>> {
        match self.lookup(model_id) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::warn!(model = model_id, "custom shape renders without children: {e}");
                None
            }
        }
    }

    fn fetch(&self, model_id: &str) -> Result<Arc<LayoutDocument>, LookupError> {
        let object = self
            .service
            .fetch_custom_shape_object(model_id)
            .map_err(|source| LookupError::Unavailable {
                model_id: model_id.to_string(),
                source,
            })?
            .ok_or_else(|| LookupError::NotFound(model_id.to_string()))?;
        let bytes = object
            .layout_structure
            .as_deref()
            .ok_or_else(|| LookupError::NotFound(model_id.to_string()))?;
        let document = LayoutDocument::parse(bytes).map_err(|source| LookupError::Corrupted {
            model_id: model_id.to_string(),
            source,
        })?;
        tracing::debug!(
            model = model_id,
            shapes = document.shapes.len(),
            "fetched custom shape layout"
        );
        Ok(Arc::new(document))
    }

    /// Expands every custom shape of `shapes`.
    ///
    /// Each custom shape is emitted first, followed by the shapes of its
    /// nested document scaled into [`RenderFrame::nested_in`] the custom
    /// shape, recursively.  The output is in paint order: a painter walking
    /// the list draws the custom shape's frame underneath its contents.
    /// `path` holds the model ids being expanded above this call and is
    /// restored before returning.
    pub fn expand(&mut self, shapes: Vec<Shape>, path: &mut Vec<String>) -> Vec<Shape> {
        let mut out = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let Some(model_id) = shape.custom_model_id().map(str::to_string) else {
                out.push(shape);
                continue;
            };
            let frame = RenderFrame::nested_in(&shape);
            out.push(shape);

            if path.contains(&model_id) {
                tracing::warn!(model = %model_id, "{}", LookupError::Cycle(model_id.clone()));
                continue;
            }
            let Some(document) = self.resolve(&model_id) else {
                continue;
            };
            path.push(model_id);
            let nested = document.place(&frame);
            out.extend(self.expand(nested, path));
            path.pop();
        }
        out
    }

    /// Decodes `bytes`, places the shapes into `frame` and expands them.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Corrupted`] when the top-level document does not
    /// decode.  Nested documents never fail the call.
    pub fn resolve_layout(
        &mut self,
        bytes: &[u8],
        frame: &RenderFrame,
    ) -> Result<Vec<Shape>, ParseError> {
        let document = LayoutDocument::parse(bytes)?;
        Ok(self.expand(document.place(frame), &mut Vec::new()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
