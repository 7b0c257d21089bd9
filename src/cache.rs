use crate::ast::Expr;
use crate::error::SyntaxError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hit/miss counters for an `ExpressionCache`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Parsed expressions keyed by source text, shareable across threads.
/// Expressions that fail to parse are not cached.
pub struct ExpressionCache {
    entries: DashMap<String, Arc<Expr>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ExpressionCache {
    /// Once `capacity` entries are held the cache is cleared before the next insert.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Expr>, SyntaxError> {
        if let Some(expr) = self.entries.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(expr.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let expr = Arc::new(crate::parse(text)?);
        log::debug!("compiled expression {:?}", text);
        if self.entries.len() >= self.capacity {
            log::debug!("expression cache full ({} entries), clearing", self.entries.len());
            self.entries.clear();
        }
        self.entries.insert(text.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_parsed_expressions() {
        let cache = ExpressionCache::default();
        let a = cache.get_or_parse("value + 1").unwrap();
        let b = cache.get_or_parse("value + 1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn syntax_errors_are_not_cached() {
        let cache = ExpressionCache::new(4);
        assert!(cache.get_or_parse("1 +").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn clears_when_full() {
        let cache = ExpressionCache::new(2);
        for text in ["1", "2", "3"] {
            cache.get_or_parse(text).unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
