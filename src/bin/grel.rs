use anyhow::{bail, Context, Result};
use clap::Parser;
use grel::{BatchConfig, BatchDriver, Bindings, CancellationToken, Evaluator, Row, RowResult, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Evaluate a GREL expression against a value, a row, or every row of a
/// JSON-lines file.
#[derive(Parser, Debug)]
#[command(name = "grel", version)]
struct Cli {
    /// Expression to evaluate, e.g. "value.split(',').length()"
    expression: String,

    /// Cell value bound to `value`
    #[arg(long, conflicts_with_all = ["row", "rows"])]
    value: Option<String>,

    /// Single row as a JSON object keyed by column name
    #[arg(long, conflicts_with = "rows")]
    row: Option<String>,

    /// JSON-lines file with one row object per line
    #[arg(long)]
    rows: Option<PathBuf>,

    /// Column whose cell is bound to `value` (defaults to the first column)
    #[arg(long)]
    column: Option<String>,

    /// Evaluate rows on a thread pool
    #[arg(long, requires = "rows")]
    parallel: bool,

    /// Worker threads for --parallel (overrides GREL_THREADS)
    #[arg(long)]
    threads: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    output_json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let expr = grel::parse(&cli.expression).map_err(|e| anyhow::anyhow!("syntax error: {}", e))?;
    let registry = grel::standard_registry();

    if let Some(path) = &cli.rows {
        return run_batch(&cli, path, expr, registry);
    }

    let row = match (&cli.value, &cli.row) {
        (Some(v), _) => {
            let column = cli.column.clone().unwrap_or_else(|| "value".to_string());
            Row::new(0, [column], vec![Value::string(v.as_str())])
        }
        (None, Some(json)) => {
            let object = parse_object(json).context("invalid --row")?;
            Row::from_json(0, Arc::new(object.keys().cloned().collect()), &object)
        }
        (None, None) => Row::new(0, Vec::<String>::new(), Vec::new()),
    };
    let row = Arc::new(row);
    let column = pick_column(&cli, &row);
    let bindings = Bindings::for_cell(&row, &column);
    let value = Evaluator::new(&registry).eval(&expr, &bindings);

    if cli.output_json {
        println!("{}", serde_json::json!({ "result": value }));
        return Ok(());
    }
    match value {
        Value::Error(e) => bail!("{}", e),
        other => println!("{}", other),
    }
    Ok(())
}

fn run_batch(cli: &Cli, path: &PathBuf, expr: grel::Expr, registry: Arc<grel::FunctionRegistry>) -> Result<()> {
    let rows = read_rows(path)?;
    let column = match rows.first() {
        Some(row) => pick_column(cli, row),
        None => return Ok(()),
    };

    let mut config = BatchConfig::from_env();
    if let Some(threads) = cli.threads {
        config.threads = threads.max(1);
    }
    let driver = BatchDriver::new(registry).with_config(config);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupted, finishing current rows");
        handler_token.cancel();
    })
    .context("failed to install Ctrl+C handler")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.parallel {
        let results = driver.run_parallel(Arc::new(expr), rows, &column, &token);
        for result in &results {
            print_result(&mut out, result, cli.output_json)?;
        }
    } else {
        let mut failure = None;
        driver.run(&expr, &rows, &column, &token, |result| {
            if failure.is_none() {
                failure = print_result(&mut out, result, cli.output_json).err();
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
    }
    out.flush()?;
    Ok(())
}

fn print_result<W: Write>(out: &mut W, result: &RowResult, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(result)?)?;
    } else {
        writeln!(out, "{}\t{}", result.row, result.value)?;
    }
    Ok(())
}

fn pick_column(cli: &Cli, row: &Row) -> String {
    cli.column
        .clone()
        .or_else(|| row.columns().first().cloned())
        .unwrap_or_else(|| "value".to_string())
}

fn parse_object(text: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(text)? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", other),
    }
}

/// Rows from a JSON-lines file. Columns are the union of keys in order of
/// first appearance; blank lines are skipped.
fn read_rows(path: &PathBuf) -> Result<Vec<Arc<Row>>> {
    let file = std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut objects = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let object = parse_object(&line).with_context(|| format!("{}:{}", path.display(), n + 1))?;
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }
    log::debug!("read {} rows with {} columns", objects.len(), columns.len());
    let columns = Arc::new(columns);
    Ok(objects
        .iter()
        .enumerate()
        .map(|(i, object)| Arc::new(Row::from_json(i, Arc::clone(&columns), object)))
        .collect())
}
