//! Processor caching and cache key derivation.
//!
//! Cache keys are truncated SHA-256 hex digests. The processor cache is
//! keyed on the config's content ID (which already folds in the context
//! and referenced file metadata) plus the request, so editing a config,
//! changing a context variable or touching a referenced LUT all miss
//! naturally. Cache hits hand out detached copies: two callers getting
//! "the same" processor never share dynamic property cells.

use std::collections::HashMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::config::Config;
use crate::context::Context;
use crate::error::ChromaResult;
use crate::processor::Processor;
use crate::transform::{Transform, TransformDirection};

/// Hex digest length kept for cache IDs.
const ID_LEN: usize = 32;

/// Finalizes a hasher into a truncated hex ID.
pub(crate) fn hex_digest(h: Sha256) -> String {
    let full = h.finalize();
    let mut out = String::with_capacity(ID_LEN);
    for byte in full.iter().take(ID_LEN / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Hashes arbitrary bytes into a truncated hex ID.
pub fn digest(data: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(data);
    hex_digest(h)
}

/// A cache of compiled processors.
///
/// Shareable across threads behind a reference; all methods take `&self`.
#[derive(Debug, Default)]
pub struct ProcessorCache {
    inner: RwLock<HashMap<String, Processor>>,
}

impl ProcessorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached processors.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached processor.
    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }

    /// Color space conversion, cached.
    pub fn colorspace_processor(
        &self,
        config: &Config,
        context: Option<&Context>,
        src: &str,
        dst: &str,
    ) -> ChromaResult<Processor> {
        let request = format!("cs:{src}->{dst}");
        self.get_or_compile(config, context, &request, || {
            config.processor_with_context(context, src, dst)
        })
    }

    /// Display pipeline, cached.
    pub fn display_processor(
        &self,
        config: &Config,
        context: Option<&Context>,
        src: &str,
        display: &str,
        view: &str,
    ) -> ChromaResult<Processor> {
        let request = format!("dv:{src}->{display}/{view}");
        self.get_or_compile(config, context, &request, || {
            config.display_processor_with_context(context, src, display, view, None)
        })
    }

    /// Arbitrary transform graph, cached. The transform's serialized form
    /// keys the entry.
    pub fn transform_processor(
        &self,
        config: &Config,
        context: Option<&Context>,
        transform: &Transform,
        direction: TransformDirection,
    ) -> ChromaResult<Processor> {
        let body = serde_yaml::to_string(transform)?;
        let request = format!("t:{direction:?}:{}", digest(body.as_bytes()));
        self.get_or_compile(config, context, &request, || {
            config.transform_processor(context, transform, direction)
        })
    }

    fn get_or_compile(
        &self,
        config: &Config,
        context: Option<&Context>,
        request: &str,
        compile: impl FnOnce() -> ChromaResult<Processor>,
    ) -> ChromaResult<Processor> {
        let key = format!("{}:{request}", config.cache_id(context)?);
        if let Some(hit) = self.inner.read().unwrap().get(&key) {
            trace!(key, "processor cache hit");
            return Ok(hit.detached());
        }
        let processor = compile()?;
        let out = processor.detached();
        self.inner.write().unwrap().insert(key, processor);
        Ok(out)
    }
}
