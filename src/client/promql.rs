use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Deadline of a single instant query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Evaluates PromQL expressions and returns the sample values.
#[async_trait]
pub trait PromQLClient: Send + Sync {
    async fn query(&self, promql: &str) -> Result<Vec<f64>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: Value,
}

/// Instant query client of the Prometheus HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    query_url: Url,
}

impl PrometheusClient {
    pub fn new(prometheus: &str) -> Result<Self> {
        let mut query_url = Url::parse(prometheus)
            .with_context(|| format!("Invalid Prometheus URL {}", prometheus))?;
        query_url
            .path_segments_mut()
            .map_err(|_| anyhow!("Prometheus URL {} cannot be a base", prometheus))?
            .pop_if_empty()
            .extend(["api", "v1", "query"]);

        let client = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .use_rustls_tls()
            .build()
            .context("Unable to build the Prometheus client")?;

        Ok(Self { client, query_url })
    }
}

#[async_trait]
impl PromQLClient for PrometheusClient {
    async fn query(&self, promql: &str) -> Result<Vec<f64>> {
        let mut url = self.query_url.clone();
        url.query_pairs_mut().append_pair("query", promql);

        let response: QueryResponse = self
            .client
            .get(url)
            .send()
            .await
            .context("Unable to reach Prometheus")?
            .json()
            .await
            .context("Unable to decode the Prometheus response")?;

        parse_query_response(response)
    }
}

fn parse_query_response(response: QueryResponse) -> Result<Vec<f64>> {
    if response.status != "success" {
        bail!(
            "Prometheus query failed: {}",
            response.error.unwrap_or_else(|| response.status.clone())
        );
    }
    let data = response
        .data
        .ok_or_else(|| anyhow!("Prometheus response has no data"))?;

    match data.result_type.as_str() {
        "scalar" => Ok(vec![sample_value(&data.result)?]),
        "vector" => data
            .result
            .as_array()
            .map(|series| {
                series
                    .iter()
                    .map(|s| sample_value(&s["value"]))
                    .collect::<Result<Vec<_>>>()
            })
            .unwrap_or_else(|| Ok(Vec::new())),
        // latest sample of every series
        "matrix" => {
            let mut values = Vec::new();
            for series in data.result.as_array().into_iter().flatten() {
                if let Some(last) = series["values"].as_array().and_then(|v| v.last()) {
                    values.push(sample_value(last)?);
                }
            }
            Ok(values)
        }
        other => bail!("Unsupported Prometheus result type {}", other),
    }
}

/// A sample is a `[timestamp, "value"]` pair.
fn sample_value(sample: &Value) -> Result<f64> {
    let raw = sample
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Malformed Prometheus sample {}", sample))?;
    raw.parse::<f64>()
        .with_context(|| format!("Invalid sample value {}", raw))
}
