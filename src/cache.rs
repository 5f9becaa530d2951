use std::sync::Arc;

use papaya::HashMap;

use crate::engine::Engine;
use crate::error::AmbraResult;

/// Cache of engine instances keyed by `{language}--{theme key}`.
///
/// Only custom-grammar engines go through here: building a syntax set from a
/// grammar definition is the expensive step we want to do once per
/// grammar+theme pair. There is no eviction, the map grows with distinct
/// pairs.
#[derive(Default)]
pub(crate) struct EngineCache {
    engines: HashMap<String, Arc<Engine>>,
}

impl EngineCache {
    pub(crate) fn cache_key(language: &str, theme_key: &str) -> String {
        format!("{language}--{theme_key}")
    }

    /// Returns the cached engine for `key`, building it with `create` on a
    /// miss. Two lookups with the same key observe the same instance.
    pub(crate) fn get_or_create(
        &self,
        key: &str,
        create: impl FnOnce() -> AmbraResult<Engine>,
    ) -> AmbraResult<Arc<Engine>> {
        let engines = self.engines.pin();
        if let Some(engine) = engines.get(key) {
            log::debug!("engine cache hit for '{key}'");
            return Ok(engine.clone());
        }

        log::debug!("engine cache miss for '{key}'");
        let engine = Arc::new(create()?);
        // A racing creator may have inserted meanwhile, keep whichever won
        Ok(engines.get_or_insert_with(key.to_owned(), || engine).clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.engines.pin().len()
    }
}
