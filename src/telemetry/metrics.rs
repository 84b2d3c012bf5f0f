//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const AUTHENTICATIONS_TOTAL: &str = "mess_auth_authentications_total";
pub const TOKENS_ISSUED_TOTAL: &str = "mess_auth_tokens_issued_total";
pub const LOGINS_TOTAL: &str = "mess_auth_logins_total";
pub const GUARD_DENIALS_TOTAL: &str = "mess_auth_guard_denials_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines from startup.
pub fn describe_metrics() {
    describe_counter!(
        AUTHENTICATIONS_TOTAL,
        "Bearer token authentication attempts by outcome"
    );
    describe_counter!(TOKENS_ISSUED_TOTAL, "Tokens minted by kind");
    describe_counter!(LOGINS_TOTAL, "Login attempts by result");
    describe_counter!(GUARD_DENIALS_TOTAL, "Requests rejected by access guards");

    counter!(AUTHENTICATIONS_TOTAL, "outcome" => "embedded").absolute(0);
    counter!(TOKENS_ISSUED_TOTAL, "kind" => "access").absolute(0);
    counter!(TOKENS_ISSUED_TOTAL, "kind" => "refresh").absolute(0);
    counter!(LOGINS_TOTAL, "result" => "success").absolute(0);
    counter!(GUARD_DENIALS_TOTAL, "reason" => "insufficient_role").absolute(0);
}
