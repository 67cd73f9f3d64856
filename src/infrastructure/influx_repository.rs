// InfluxDB repository implementation
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::cell::CellId;
use crate::domain::errors::StorageError;
use crate::domain::telemetry::{TelemetrySample, TelemetryStats, TimeRange};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxQLSeries {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn f64_at(&self, row: &[serde_json::Value], name: &str) -> Option<f64> {
        self.column(name).and_then(|idx| row.get(idx)).and_then(|v| v.as_f64())
    }
}

impl InfluxQLResponse {
    fn first_series(&self) -> Option<&InfluxQLSeries> {
        self.results
            .first()
            .and_then(|r| r.series.as_ref())
            .and_then(|s| s.first())
    }
}

impl InfluxRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        retention_policy: String,
        measurement: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
            measurement,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=ns",
            self.host, self.database, self.retention_policy
        )
    }

    /// Line protocol record for one sample; `cell_id` is a tag, readings are fields.
    /// Points sharing a tag set and timestamp overwrite each other, so the
    /// timestamp is written at nanosecond precision.
    fn to_line(&self, sample: &TelemetrySample) -> Result<String> {
        let ts = sample
            .ts
            .timestamp_nanos_opt()
            .with_context(|| format!("timestamp {} outside the nanosecond range", sample.ts))?;
        Ok(format!(
            "{},cell_id={} voltage={},temperature={},cycle_count={}i {}",
            self.measurement,
            sample.cell_id,
            sample.voltage,
            sample.temperature,
            sample.cycle_count,
            ts
        ))
    }

    fn where_clause(&self, cell_id: CellId, range: &TimeRange) -> String {
        format!(
            "\"cell_id\" = '{}' AND time >= '{}' AND time <= '{}'",
            cell_id,
            range.start.to_rfc3339_opts(SecondsFormat::Nanos, true),
            range.end.to_rfc3339_opts(SecondsFormat::Nanos, true)
        )
    }

    fn history_query(&self, cell_id: CellId, range: &TimeRange, offset: usize, limit: usize) -> String {
        format!(
            "SELECT voltage, temperature, cycle_count FROM \"{}\" WHERE {} ORDER BY time ASC LIMIT {} OFFSET {}",
            self.measurement,
            self.where_clause(cell_id, range),
            limit,
            offset
        )
    }

    fn latest_query(&self, cell_id: CellId) -> String {
        format!(
            "SELECT voltage, temperature, cycle_count FROM \"{}\" WHERE \"cell_id\" = '{}' ORDER BY time DESC LIMIT 1",
            self.measurement, cell_id
        )
    }

    fn aggregate_query(&self, cell_id: CellId, range: &TimeRange) -> String {
        format!(
            "SELECT MEAN(voltage) AS avg_voltage, MAX(voltage) AS max_voltage, MIN(voltage) AS min_voltage, \
             MEAN(temperature) AS avg_temperature, MAX(temperature) AS max_temperature, \
             MIN(temperature) AS min_temperature, COUNT(voltage) AS data_points FROM \"{}\" WHERE {}",
            self.measurement,
            self.where_clause(cell_id, range)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        // Check for errors in the response
        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                anyhow::bail!("InfluxDB query error: {}", error);
            }
        }

        Ok(data)
    }

    async fn write_line(&self, line: String) -> Result<()> {
        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .body(line)
            .send()
            .await
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed with status {}: {}", status, body);
        }

        Ok(())
    }

    fn parse_samples(cell_id: CellId, response: &InfluxQLResponse) -> Vec<TelemetrySample> {
        let mut samples = Vec::new();
        let Some(series) = response.first_series() else {
            return samples;
        };
        let Some(time_idx) = series.column("time") else {
            return samples;
        };

        for row in &series.values {
            let ts = row
                .get(time_idx)
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));

            if let (Some(ts), Some(voltage), Some(temperature)) = (
                ts,
                series.f64_at(row, "voltage"),
                series.f64_at(row, "temperature"),
            ) {
                let cycle_count = series.f64_at(row, "cycle_count").unwrap_or(0.0) as i64;
                samples.push(TelemetrySample::new(cell_id, voltage, temperature, cycle_count, ts));
            }
        }

        samples
    }

    fn parse_stats(response: &InfluxQLResponse) -> TelemetryStats {
        let Some(series) = response.first_series() else {
            return TelemetryStats::default();
        };
        let Some(row) = series.values.first() else {
            return TelemetryStats::default();
        };

        let field = |name: &str| series.f64_at(row, name).unwrap_or(0.0);
        TelemetryStats {
            avg_voltage: field("avg_voltage"),
            max_voltage: field("max_voltage"),
            min_voltage: field("min_voltage"),
            avg_temperature: field("avg_temperature"),
            max_temperature: field("max_temperature"),
            min_temperature: field("min_temperature"),
            data_points: field("data_points") as u64,
        }
    }
}

/// Connection failures and timeouts mean the server is unreachable; anything
/// else is reported as a backend error.
fn storage_error(error: anyhow::Error) -> StorageError {
    match error.downcast_ref::<reqwest::Error>() {
        Some(e) if e.is_connect() || e.is_timeout() => StorageError::Unavailable(e.to_string()),
        _ => StorageError::Backend(error),
    }
}

#[async_trait]
impl TelemetryRepository for InfluxRepository {
    async fn append(&self, sample: &TelemetrySample) -> Result<(), StorageError> {
        let line = self.to_line(sample).map_err(storage_error)?;
        self.write_line(line).await.map_err(storage_error)?;
        Ok(())
    }

    async fn history_page(
        &self,
        cell_id: CellId,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TelemetrySample>, StorageError> {
        let query = self.history_query(cell_id, &range, offset, limit);
        tracing::debug!("Executing history query: {}", query);
        let response = self.execute_query(&query).await.map_err(storage_error)?;
        Ok(Self::parse_samples(cell_id, &response))
    }

    async fn latest(&self, cell_id: CellId) -> Result<Option<TelemetrySample>, StorageError> {
        let response = self
            .execute_query(&self.latest_query(cell_id))
            .await
            .map_err(storage_error)?;
        Ok(Self::parse_samples(cell_id, &response).into_iter().next())
    }

    async fn aggregate(&self, cell_id: CellId, range: TimeRange) -> Result<TelemetryStats, StorageError> {
        let response = self
            .execute_query(&self.aggregate_query(cell_id, &range))
            .await
            .map_err(storage_error)?;
        Ok(Self::parse_stats(&response))
    }
}
