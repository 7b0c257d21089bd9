use crate::ast::Expr;
use crate::context::Bindings;
use crate::host::Row;
use crate::registry::FunctionRegistry;
use crate::runtime::Evaluator;
use crate::types::Value;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Cooperative cancellation flag shared between a batch and its controller.
/// Checked before each row; a row already being evaluated runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Worker threads for `run_parallel`.
    pub threads: usize,
    /// Rows handed to a worker per job.
    pub chunk_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { threads: num_cpus::get(), chunk_size: 64 }
    }
}

impl BatchConfig {
    /// Defaults overridden by `GREL_THREADS` and `GREL_CHUNK_SIZE`. Values
    /// that are not positive integers are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = env_count("GREL_THREADS") {
            config.threads = n;
        }
        if let Some(n) = env_count("GREL_CHUNK_SIZE") {
            config.chunk_size = n;
        }
        config
    }
}

fn env_count(var: &str) -> Option<usize> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            log::warn!("ignoring {}={:?}: expected a positive integer", var, raw);
            None
        }
    }
}

/// Outcome for one row. `row` is the row's own index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResult {
    pub row: usize,
    pub value: Value,
}

/// Evaluates one expression against many rows.
pub struct BatchDriver {
    registry: Arc<FunctionRegistry>,
    config: BatchConfig,
}

impl BatchDriver {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry, config: BatchConfig::default() }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Evaluates rows in order, calling `on_result` after each one. Stops
    /// before the next row once `token` is cancelled, so the result holds
    /// exactly the rows evaluated so far.
    pub fn run<F>(
        &self,
        expr: &Expr,
        rows: &[Arc<Row>],
        column: &str,
        token: &CancellationToken,
        mut on_result: F,
    ) -> Vec<RowResult>
    where
        F: FnMut(&RowResult),
    {
        let evaluator = Evaluator::new(&self.registry);
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            if token.is_cancelled() {
                log::info!("batch cancelled after {} of {} rows", results.len(), rows.len());
                break;
            }
            let result = evaluate_row(&evaluator, expr, row, column);
            on_result(&result);
            results.push(result);
        }
        results
    }

    /// Evaluates rows on a thread pool in chunks. Results come back in input
    /// order; rows skipped because of cancellation are absent.
    pub fn run_parallel(
        &self,
        expr: Arc<Expr>,
        rows: Vec<Arc<Row>>,
        column: &str,
        token: &CancellationToken,
    ) -> Vec<RowResult> {
        let total = rows.len();
        let rows: Arc<Vec<Arc<Row>>> = Arc::new(rows);
        let threads = self.config.threads.max(1);
        let chunk_size = self.config.chunk_size.max(1);
        log::debug!("evaluating {} rows on {} threads in chunks of {}", total, threads, chunk_size);

        let pool = threadpool::ThreadPool::new(threads);
        let (tx, rx) = mpsc::channel::<(usize, RowResult)>();
        for start in (0..total).step_by(chunk_size) {
            let end = (start + chunk_size).min(total);
            let rows = Arc::clone(&rows);
            let expr = Arc::clone(&expr);
            let registry = Arc::clone(&self.registry);
            let column = column.to_string();
            let token = token.clone();
            let tx = tx.clone();
            pool.execute(move || {
                let evaluator = Evaluator::new(&registry);
                for position in start..end {
                    if token.is_cancelled() {
                        break;
                    }
                    let result = evaluate_row(&evaluator, &expr, &rows[position], &column);
                    if tx.send((position, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        pool.join();

        let mut results: Vec<(usize, RowResult)> = rx.into_iter().collect();
        results.sort_by_key(|(position, _)| *position);
        if results.len() < total {
            log::info!("batch cancelled with {} of {} rows evaluated", results.len(), total);
        }
        if pool.panic_count() > 0 {
            log::error!("{} batch workers panicked", pool.panic_count());
        }
        results.into_iter().map(|(_, r)| r).collect()
    }
}

fn evaluate_row(evaluator: &Evaluator<'_>, expr: &Expr, row: &Arc<Row>, column: &str) -> RowResult {
    let bindings = Bindings::for_cell(row, column);
    let value = evaluator.eval(expr, &bindings);
    if let Value::Error(e) = &value {
        log::trace!("row {}: {}", row.index, e);
    }
    RowResult { row: row.index, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::registry::{FunctionDescriptor, NUMBER};

    fn rows(n: usize) -> Vec<Arc<Row>> {
        (0..n)
            .map(|i| Arc::new(Row::new(i, ["n"], vec![Value::Number(i as f64)])))
            .collect()
    }

    #[test]
    fn parallel_results_keep_input_order() {
        let driver = BatchDriver::new(Arc::new(FunctionRegistry::with_builtins()))
            .with_config(BatchConfig { threads: 4, chunk_size: 3 });
        let expr = Arc::new(crate::parse("value * 2").unwrap());
        let out = driver.run_parallel(expr, rows(20), "n", &CancellationToken::new());
        assert_eq!(out.len(), 20);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r.row, i);
            assert_eq!(r.value, Value::Number(i as f64 * 2.0));
        }
    }

    /// Registry with `stopAt(n, k)`, which cancels `token` while evaluating
    /// the row where `n == k` and returns `n`.
    fn cancelling_registry(token: &CancellationToken) -> Arc<FunctionRegistry> {
        let mut reg = FunctionRegistry::with_builtins();
        let token = token.clone();
        reg.register(
            FunctionDescriptor::new("stopAt", move |a: &[Value], _: &dyn EvaluationContext| {
                if a[0] == a[1] {
                    token.cancel();
                }
                Ok(a[0].clone())
            })
            .params([NUMBER, NUMBER]),
        )
        .unwrap();
        Arc::new(reg)
    }

    #[test]
    fn cancel_mid_run_keeps_an_ordered_prefix() {
        let token = CancellationToken::new();
        let driver = BatchDriver::new(cancelling_registry(&token))
            .with_config(BatchConfig { threads: 1, chunk_size: 4 });
        let expr = Arc::new(crate::parse("stopAt(value, 9) * 2").unwrap());
        let out = driver.run_parallel(expr, rows(40), "n", &token);
        assert_eq!(out.len(), 10);
        for (i, r) in out.iter().enumerate() {
            assert_eq!(r.row, i);
            assert_eq!(r.value, Value::Number(i as f64 * 2.0));
        }
    }

    #[test]
    fn cancel_mid_run_across_workers_keeps_order() {
        let token = CancellationToken::new();
        let driver = BatchDriver::new(cancelling_registry(&token))
            .with_config(BatchConfig { threads: 4, chunk_size: 2 });
        let expr = Arc::new(crate::parse("stopAt(value, 5) * 2").unwrap());
        let out = driver.run_parallel(expr, rows(200), "n", &token);
        assert!(token.is_cancelled());
        assert!(out.iter().any(|r| r.row == 5));
        assert!(out.windows(2).all(|w| w[0].row < w[1].row));
        for r in &out {
            assert_eq!(r.value, Value::Number(r.row as f64 * 2.0));
        }
    }

    #[test]
    fn cancelled_before_start_evaluates_nothing() {
        let driver = BatchDriver::new(Arc::new(FunctionRegistry::with_builtins()));
        let token = CancellationToken::new();
        token.cancel();
        let expr = Arc::new(crate::parse("value").unwrap());
        assert!(driver.run_parallel(expr, rows(10), "n", &token).is_empty());
    }
}
