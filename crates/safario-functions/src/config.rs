//! Upstream endpoints and credentials.

use serde::Deserialize;

fn default_weather_base_url() -> String { "https://api.openweathermap.org".to_owned() }
fn default_mapbox_base_url() -> String { "https://api.mapbox.com".to_owned() }
fn default_nominatim_base_url() -> String { "https://nominatim.openstreetmap.org".to_owned() }
fn default_twilio_base_url() -> String { "https://api.twilio.com".to_owned() }

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionsConfig {
  /// Public Mapbox token, handed to clients and used for geocoding.
  #[serde(default)]
  pub mapbox_token:        Option<String>,
  #[serde(default)]
  pub openweather_api_key: Option<String>,
  #[serde(default = "default_weather_base_url")]
  pub weather_base_url:    String,
  #[serde(default = "default_mapbox_base_url")]
  pub mapbox_base_url:     String,
  #[serde(default = "default_nominatim_base_url")]
  pub nominatim_base_url:  String,
  #[serde(default)]
  pub twilio:              TwilioConfig,
}

impl Default for FunctionsConfig {
  fn default() -> Self {
    Self {
      mapbox_token:        None,
      openweather_api_key: None,
      weather_base_url:    default_weather_base_url(),
      mapbox_base_url:     default_mapbox_base_url(),
      nominatim_base_url:  default_nominatim_base_url(),
      twilio:              TwilioConfig::default(),
    }
  }
}

/// Twilio Messages API credentials. SMS sending fails until all three of
/// `account_sid`, `auth_token` and `from_number` are set.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
  #[serde(default)]
  pub account_sid: Option<String>,
  #[serde(default)]
  pub auth_token:  Option<String>,
  #[serde(default)]
  pub from_number: Option<String>,
  #[serde(default = "default_twilio_base_url")]
  pub base_url:    String,
}

impl Default for TwilioConfig {
  fn default() -> Self {
    Self {
      account_sid: None,
      auth_token:  None,
      from_number: None,
      base_url:    default_twilio_base_url(),
    }
  }
}
