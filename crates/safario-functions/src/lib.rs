//! Proxy functions that front third-party services: the map token issuer,
//! weather, nearby places, and SMS one-time passwords.
//!
//! Secrets for the upstreams stay server-side in [`FunctionsConfig`]; clients
//! only ever see the reshaped responses.

#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod otp;
pub mod places;
pub mod weather;

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

pub use config::{FunctionsConfig, TwilioConfig};
pub use error::{Error, Result};

use crate::{
  otp::{OtpService, TwilioSender},
  places::PlacesClient,
  weather::WeatherClient,
};

/// Timeout applied to every upstream request.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// `{ "token": ... }`, empty when no token is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapToken {
  pub token: String,
}

/// All proxy functions, sharing one HTTP connection pool.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Functions {
  pub weather:  WeatherClient,
  pub places:   PlacesClient,
  pub otp:      OtpService<TwilioSender>,
  mapbox_token: Option<String>,
}

impl Functions {
  pub fn new(config: &FunctionsConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(UPSTREAM_TIMEOUT)
      .build()
      .map_err(|source| Error::Http { service: "client", source })?;

    Ok(Self {
      weather:      WeatherClient::new(
        client.clone(),
        &config.weather_base_url,
        config.openweather_api_key.clone(),
      ),
      places:       PlacesClient::new(
        client.clone(),
        &config.mapbox_base_url,
        config.mapbox_token.clone(),
        &config.nominatim_base_url,
      ),
      otp:          OtpService::new(TwilioSender::new(client, config.twilio.clone())),
      mapbox_token: config.mapbox_token.clone(),
    })
  }

  pub fn map_token(&self) -> MapToken {
    MapToken { token: self.mapbox_token.clone().unwrap_or_default() }
  }
}
