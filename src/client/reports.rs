//! Monitor reports: `/v2/reporting/monitor-reports`.
//!
//! Both endpoints take an optional `from`/`to` window; without one the API
//! reports on its default period.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::nullable;
use super::{validate_resource_id, with_query, HyperpingClient};

const REPORTS_PATH: &str = "/v2/reporting/monitor-reports";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorReport {
    pub uuid: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub protocol: String,
    #[serde(deserialize_with = "nullable")]
    pub period: ReportPeriod,
    /// Uptime percentage over the period.
    pub sla: f64,
    /// Mean time to recovery, seconds.
    pub mttr: i64,
    #[serde(deserialize_with = "nullable")]
    pub mttr_formatted: String,
    #[serde(deserialize_with = "nullable")]
    pub outages: OutageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPeriod {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutageStats {
    pub count: i64,
    /// Seconds.
    pub total_downtime: i64,
    #[serde(deserialize_with = "nullable")]
    pub total_downtime_formatted: String,
    /// Seconds.
    pub longest_outage: i64,
    #[serde(deserialize_with = "nullable")]
    pub longest_outage_formatted: String,
    #[serde(deserialize_with = "nullable")]
    pub details: Vec<OutageDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutageDetail {
    pub start_date: String,
    pub end_date: String,
    pub duration: i64,
    pub duration_formatted: String,
}

#[derive(Deserialize)]
struct ReportList {
    #[serde(default, deserialize_with = "nullable")]
    monitors: Vec<MonitorReport>,
}

fn period_params(from: Option<&str>, to: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(from) = from.filter(|s| !s.is_empty()) {
        params.push(("from", from.to_string()));
    }
    if let Some(to) = to.filter(|s| !s.is_empty()) {
        params.push(("to", to.to_string()));
    }
    params
}

impl HyperpingClient {
    pub async fn get_monitor_report(
        &self,
        id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<MonitorReport, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetMonitorReport"))?;
        let path = with_query(format!("{}/{}", REPORTS_PATH, id), &period_params(from, to));
        self.get(&path)
            .await
            .map_err(|e| e.context(format!("failed to get monitor report {}", id)))
    }

    /// Reports for every monitor. The response wraps them as
    /// `{"period": {...}, "monitors": [...]}`.
    pub async fn list_monitor_reports(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<MonitorReport>, ClientError> {
        let path = with_query(REPORTS_PATH.to_string(), &period_params(from, to));
        let list: ReportList = self
            .get(&path)
            .await
            .map_err(|e| e.context("failed to list monitor reports"))?;
        Ok(list.monitors)
    }
}
