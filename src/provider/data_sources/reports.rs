//! `hyperping_monitor_report` and `hyperping_monitor_reports`: uptime, SLA
//! and outage statistics over an optional `from`/`to` window.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{HyperpingClient, MonitorReport};
use crate::error::Result;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::types::{is_null_or_unknown, StateResponse};
use crate::validators::Validator;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::{to_state, DataSource};

use super::{config_object, lookup_id};

fn period_attribute(description: &str) -> Attribute {
    Attribute::optional_string()
        .with_description(description)
        .with_validator(Validator::Iso8601)
}

fn period(config: &Value, key: &str) -> Option<String> {
    config
        .get(key)
        .filter(|v| !is_null_or_unknown(v))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Serialize)]
struct OutageSummary<'a> {
    count: i64,
    total_downtime: i64,
    total_downtime_formatted: &'a str,
    longest_outage: i64,
    longest_outage_formatted: &'a str,
}

/// One row of `hyperping_monitor_reports`.
#[derive(Serialize)]
struct ReportItem<'a> {
    id: &'a str,
    name: &'a str,
    protocol: &'a str,
    sla: f64,
    mttr: i64,
    mttr_formatted: &'a str,
    outage_count: i64,
    total_downtime: i64,
    total_downtime_formatted: &'a str,
}

impl<'a> From<&'a MonitorReport> for ReportItem<'a> {
    fn from(r: &'a MonitorReport) -> Self {
        Self {
            id: &r.uuid,
            name: &r.name,
            protocol: &r.protocol,
            sla: r.sla,
            mttr: r.mttr,
            mttr_formatted: &r.mttr_formatted,
            outage_count: r.outages.count,
            total_downtime: r.outages.total_downtime,
            total_downtime_formatted: &r.outages.total_downtime_formatted,
        }
    }
}

pub(crate) struct MonitorReportDataSource;

#[async_trait]
impl DataSource for MonitorReportDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_monitor_report"
    }

    fn schema(&self) -> Schema {
        let outages = Block::new()
            .with_attribute("count", Attribute::computed_int64())
            .with_attribute("total_downtime", Attribute::computed_int64())
            .with_attribute("total_downtime_formatted", Attribute::computed_string())
            .with_attribute("longest_outage", Attribute::computed_int64())
            .with_attribute("longest_outage_formatted", Attribute::computed_string());
        Schema::v0()
            .with_attribute(
                "id",
                Attribute::required_string()
                    .with_description("Monitor UUID")
                    .with_validator(Validator::ResourceId),
            )
            .with_attribute("from", period_attribute("Start of the report period (ISO 8601)"))
            .with_attribute("to", period_attribute("End of the report period (ISO 8601)"))
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("protocol", Attribute::computed_string())
            .with_attribute(
                "sla",
                Attribute::computed_float64().with_description("Uptime percentage"),
            )
            .with_block("outages", NestedBlock::single(outages).computed())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let from = period(&config, "from");
        let to = period(&config, "to");
        let report = client
            .get_monitor_report(&id, from.as_deref(), to.as_deref())
            .await
            .map_err(|e| read_error("Monitor Report", &id, &e))?;

        let mut state = config_object(&config);
        state.insert("name".into(), Value::from(report.name.as_str()));
        state.insert("protocol".into(), Value::from(report.protocol.as_str()));
        state.insert("sla".into(), Value::from(report.sla));
        state.insert(
            "outages".into(),
            to_state(&OutageSummary {
                count: report.outages.count,
                total_downtime: report.outages.total_downtime,
                total_downtime_formatted: &report.outages.total_downtime_formatted,
                longest_outage: report.outages.longest_outage,
                longest_outage_formatted: &report.outages.longest_outage_formatted,
            })?,
        );
        Ok(StateResponse::new(Value::Object(state)))
    }
}

pub(crate) struct MonitorReportsDataSource;

#[async_trait]
impl DataSource for MonitorReportsDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_monitor_reports"
    }

    fn schema(&self) -> Schema {
        let item = Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("protocol", Attribute::computed_string())
            .with_attribute("sla", Attribute::computed_float64())
            .with_attribute("mttr", Attribute::computed_int64())
            .with_attribute("mttr_formatted", Attribute::computed_string())
            .with_attribute("outage_count", Attribute::computed_int64())
            .with_attribute("total_downtime", Attribute::computed_int64())
            .with_attribute("total_downtime_formatted", Attribute::computed_string());
        Schema::v0()
            .with_attribute("from", period_attribute("Start of the report period (ISO 8601)"))
            .with_attribute("to", period_attribute("End of the report period (ISO 8601)"))
            .with_block("monitors", NestedBlock::list(item).computed())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let from = period(&config, "from");
        let to = period(&config, "to");
        let reports = client
            .list_monitor_reports(from.as_deref(), to.as_deref())
            .await
            .map_err(|e| list_error("Monitor Reports", &e))?;
        debug!(count = reports.len(), "Listed monitor reports");

        let items: Vec<ReportItem<'_>> = reports.iter().map(ReportItem::from).collect();
        let mut state = config_object(&config);
        state.insert("monitors".into(), to_state(&items)?);
        Ok(StateResponse::new(Value::Object(state)))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::{ok, path_of, status};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use crate::testing::{assert_error_contains, error_diagnostics};
    use reqwest::Method;
    use serde_json::json;

    fn report(uuid: &str, sla: f64) -> serde_json::Value {
        json!({
            "uuid": uuid,
            "name": "API",
            "protocol": "http",
            "sla": sla,
            "mttr": 90,
            "mttrFormatted": "1m 30s",
            "outages": {
                "count": 1,
                "totalDowntime": 90,
                "totalDowntimeFormatted": "1m 30s",
                "longestOutage": 90,
                "longestOutageFormatted": "1m 30s"
            }
        })
    }

    #[tokio::test]
    async fn test_report_lookup_keeps_period() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::GET
                    && path_of(r)
                        == "/v2/reporting/monitor-reports/mon_api001?from=2026-01-01T00%3A00%3A00Z&to=2026-02-01T00%3A00%3A00Z"
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(report("mon_api001", 99.9)) }));
        let tester = tester(mock).await;

        let read = tester
            .read_data_source(
                "hyperping_monitor_report",
                json!({
                    "id": "mon_api001",
                    "from": "2026-01-01T00:00:00Z",
                    "to": "2026-02-01T00:00:00Z"
                }),
            )
            .await
            .unwrap();
        assert_eq!(read.state["from"], "2026-01-01T00:00:00Z");
        assert_eq!(read.state["sla"], 99.9);
        assert_eq!(read.state["outages"]["longest_outage_formatted"], "1m 30s");
    }

    #[tokio::test]
    async fn test_report_lookup_not_found() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Box::pin(async { status(404, json!({"error": "Monitor not found"})) }));
        let tester = tester(mock).await;

        let err = tester
            .read_data_source("hyperping_monitor_report", json!({"id": "mon_gone001"}))
            .await
            .unwrap_err();
        assert_error_contains(&error_diagnostics(err), "Failed to Read Monitor Report");
    }

    #[tokio::test]
    async fn test_reports_flatten_outage_stats() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| path_of(r) == "/v2/reporting/monitor-reports")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({
                        "period": {"from": "2026-01-01", "to": "2026-01-31"},
                        "monitors": [report("mon_api001", 100.0), report("mon_web001", 98.5)]
                    }))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source("hyperping_monitor_reports", json!({}))
            .await
            .unwrap();
        let monitors = read.state["monitors"].as_array().unwrap();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[1]["id"], "mon_web001");
        assert_eq!(monitors[1]["sla"], 98.5);
        assert_eq!(monitors[1]["outage_count"], 1);
        assert_eq!(monitors[1]["mttr_formatted"], "1m 30s");
    }

    #[tokio::test]
    async fn test_report_period_must_be_iso8601() {
        let tester = tester(MockHttpTransport::new()).await;
        let err = tester
            .validate_data_source_config("hyperping_monitor_reports", json!({"from": "yesterday"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid ISO 8601 Format"), "{err}");
    }
}
