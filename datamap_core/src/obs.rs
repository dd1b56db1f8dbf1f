//! Per-operation observability hook shared by the repository and the backends.
//! Emits nothing unless the `tracing` or `metrics` feature is enabled.

use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::info;

#[inline]
#[allow(unused_variables)]
pub fn obs_record(op: &str, table: &str, start: Instant, rows: usize, success: bool) {
    let elapsed = start.elapsed().as_millis() as u64;
    #[cfg(feature = "tracing")]
    {
        info!(
            table = table,
            op = op,
            rows = rows,
            elapsed_ms = elapsed,
            success = success,
            "repo op"
        );
    }
    #[cfg(feature = "metrics")]
    {
        metrics::counter!("repo_ops_total", 1, "op" => op.to_string(), "table" => table.to_string(), "success" => success.to_string());
        metrics::histogram!("repo_op_duration_ms", elapsed as f64, "op" => op.to_string(), "table" => table.to_string());
        if !success {
            metrics::counter!("repo_op_errors_total", 1, "op" => op.to_string(), "table" => table.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obs_record_is_callable_without_subscribers() {
        obs_record("find", "creams", Instant::now(), 1, true);
        obs_record("find", "creams", Instant::now(), 0, false);
    }
}
