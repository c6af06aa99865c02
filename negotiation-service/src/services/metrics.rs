use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Called once from `main`; tests
/// run without a recorder and the macros below become no-ops.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics recorder already initialized");
    }

    metrics::describe_counter!(
        "negotiation_tool_calls_total",
        "Tool invocations by tool name and outcome"
    );
    metrics::describe_counter!(
        "negotiation_sessions_completed_total",
        "Negotiation sessions closed with an accepted offer"
    );
    metrics::describe_counter!(
        "negotiation_mandates_total",
        "Payment mandate lifecycle transitions by resulting status"
    );
    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_tool_call(tool: &str, outcome: &'static str) {
    metrics::counter!(
        "negotiation_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_session_completed() {
    metrics::counter!("negotiation_sessions_completed_total").increment(1);
}

pub fn record_mandate(status: &'static str) {
    metrics::counter!("negotiation_mandates_total", "status" => status).increment(1);
}
