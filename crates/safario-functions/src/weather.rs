//! Current weather via OpenWeatherMap, reshaped for the dashboard widget.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const SERVICE: &str = "OpenWeatherMap";

/// What the client renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weather {
  /// Degrees Celsius, rounded to the nearest integer (halves up).
  pub temp:        i64,
  pub condition:   String,
  pub humidity:    u32,
  pub description: String,
}

// Only the fields we keep from the upstream payload.

#[derive(Debug, Deserialize)]
struct Upstream {
  main:    UpstreamMain,
  weather: Vec<UpstreamCondition>,
}

#[derive(Debug, Deserialize)]
struct UpstreamMain {
  temp:     f64,
  humidity: u32,
}

#[derive(Debug, Deserialize)]
struct UpstreamCondition {
  main:        String,
  #[serde(default)]
  description: String,
}

impl Weather {
  fn from_upstream(data: Upstream) -> Result<Self> {
    let condition = data.weather.into_iter().next().ok_or_else(|| Error::Malformed {
      service: SERVICE,
      reason:  "no weather conditions".to_owned(),
    })?;
    Ok(Self {
      temp:        round_half_up(data.main.temp),
      condition:   condition.main,
      humidity:    data.main.humidity,
      description: condition.description,
    })
  }
}

/// Round to the nearest integer with exact halves going towards +∞, so
/// `-2.5` becomes `-2`.
fn round_half_up(x: f64) -> i64 { (x + 0.5).floor() as i64 }

#[derive(Clone)]
pub struct WeatherClient {
  client:   Client,
  base_url: String,
  api_key:  Option<String>,
}

impl WeatherClient {
  pub fn new(client: Client, base_url: &str, api_key: Option<String>) -> Self {
    Self { client, base_url: base_url.trim_end_matches('/').to_owned(), api_key }
  }

  /// `GET {base}/data/2.5/weather?lat=..&lon=..&units=metric&appid=..`
  pub async fn current(&self, lat: f64, lng: f64) -> Result<Weather> {
    let api_key = self
      .api_key
      .as_deref()
      .ok_or(Error::NotConfigured("OpenWeatherMap API key"))?;

    let resp = self
      .client
      .get(format!("{}/data/2.5/weather", self.base_url))
      .query(&[
        ("lat", lat.to_string()),
        ("lon", lng.to_string()),
        ("units", "metric".to_owned()),
        ("appid", api_key.to_owned()),
      ])
      .send()
      .await
      .map_err(|source| Error::Http { service: SERVICE, source })?;

    if !resp.status().is_success() {
      tracing::warn!(status = %resp.status(), "weather lookup failed");
      return Err(Error::Upstream { service: SERVICE, status: resp.status() });
    }

    let data: Upstream = resp
      .json()
      .await
      .map_err(|e| Error::Malformed { service: SERVICE, reason: e.to_string() })?;
    Weather::from_upstream(data)
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
  use serde_json::json;

  use super::*;

  async fn mock_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }

  #[test]
  fn rounding_sends_halves_up() {
    assert_eq!(round_half_up(21.6), 22);
    assert_eq!(round_half_up(21.5), 22);
    assert_eq!(round_half_up(21.4), 21);
    assert_eq!(round_half_up(-2.5), -2);
    assert_eq!(round_half_up(-2.6), -3);
  }

  #[tokio::test]
  async fn reshapes_upstream_payload() {
    let router = Router::new().route(
      "/data/2.5/weather",
      get(|Query(q): Query<HashMap<String, String>>| async move {
        assert_eq!(q.get("units").map(String::as_str), Some("metric"));
        assert_eq!(q.get("appid").map(String::as_str), Some("owm-key"));
        Json(json!({
          "main": { "temp": 21.6, "humidity": 80 },
          "weather": [{ "main": "Rain", "description": "light rain" }],
        }))
      }),
    );
    let base = mock_upstream(router).await;

    let client = WeatherClient::new(Client::new(), &base, Some("owm-key".into()));
    let weather = client.current(19.07, 72.87).await.unwrap();
    assert_eq!(weather.temp, 22);
    assert_eq!(weather.condition, "Rain");
    assert_eq!(weather.humidity, 80);
    assert_eq!(weather.description, "light rain");
  }

  #[tokio::test]
  async fn missing_key_fails_before_calling_upstream() {
    let client = WeatherClient::new(Client::new(), "http://127.0.0.1:9", None);
    assert!(matches!(client.current(0.0, 0.0).await, Err(Error::NotConfigured(_))));
  }

  #[tokio::test]
  async fn upstream_error_status_is_reported() {
    let router = Router::new()
      .route("/data/2.5/weather", get(|| async { StatusCode::UNAUTHORIZED }));
    let base = mock_upstream(router).await;

    let client = WeatherClient::new(Client::new(), &base, Some("bad".into()));
    assert!(matches!(
      client.current(1.0, 1.0).await,
      Err(Error::Upstream { status: reqwest::StatusCode::UNAUTHORIZED, .. })
    ));
  }
}
