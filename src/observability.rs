//! Structured diagnostics for the reducer and the solver.
//!
//! The `log_metric!` macro turns a list of key/value pairs into a single JSON-like
//! line on the `puan_rspy::metrics` log target at `debug` level. Nothing is
//! formatted unless that level is enabled for the target.

/// Logs a structured key-value metric line.
///
/// ```ignore
/// log_metric!("event" = "branch_and_bound", "nodes" = &nodes);
/// ```
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if log::log_enabled!(target: "puan_rspy::metrics", log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!(target: "puan_rspy::metrics", "PUAN_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
