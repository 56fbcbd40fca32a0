//! SMS one-time passwords.
//!
//! A six-digit code is texted to the caller and only its SHA-256 digest is
//! kept, in an [`OtpChallenge`] that expires after ten minutes or five wrong
//! guesses. The code itself is never returned to the requester.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use rand_core::{OsRng, RngCore};
use reqwest::Client;
use safario_core::{account::OtpChallenge, store::SafetyStore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq as _;

use crate::{Error, Result, TwilioConfig};

pub const OTP_TTL_MINUTES: i64 = 10;

const CODE_FLOOR: u32 = 100_000;
const CODE_SPAN: u32 = 900_000;

// ─── Pure helpers ────────────────────────────────────────────────────────────

/// Normalise to `+<digits>`: a leading `+` is required, anything that is not
/// a digit after it is dropped, and the result must be 10 to 16 characters.
pub fn normalize_e164(raw: &str) -> Result<String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(Error::InvalidPhone("Phone number is required".to_owned()));
  }
  let Some(rest) = raw.strip_prefix('+') else {
    return Err(Error::InvalidPhone(
      "Phone number must be in E.164 format (e.g., +919876543210)".to_owned(),
    ));
  };
  let cleaned: String =
    std::iter::once('+').chain(rest.chars().filter(char::is_ascii_digit)).collect();
  if !(10..=16).contains(&cleaned.len()) {
    return Err(Error::InvalidPhone(
      "Phone number must be between 10 and 15 digits (including country code)".to_owned(),
    ));
  }
  Ok(cleaned)
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String { hex::encode(Sha256::digest(input.as_bytes())) }

/// A uniformly distributed code in `100000..=999999`.
pub fn generate_code() -> String {
  // Largest multiple of CODE_SPAN that fits in a u32; draws above it are
  // rejected so the modulo stays unbiased.
  let zone = u32::MAX - u32::MAX % CODE_SPAN;
  loop {
    let draw = OsRng.next_u32();
    if draw < zone {
      return (CODE_FLOOR + draw % CODE_SPAN).to_string();
    }
  }
}

pub fn sms_body(code: &str) -> String {
  format!("Your Safario verification code is: {code}. Valid for {OTP_TTL_MINUTES} minutes.")
}

// ─── SMS delivery ────────────────────────────────────────────────────────────

pub trait SmsSender: Send + Sync {
  fn send(&self, to: &str, body: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Sends through the Twilio Messages API.
#[derive(Clone)]
pub struct TwilioSender {
  client: Client,
  config: TwilioConfig,
}

impl TwilioSender {
  pub fn new(client: Client, config: TwilioConfig) -> Self { Self { client, config } }
}

impl SmsSender for TwilioSender {
  async fn send(&self, to: &str, body: &str) -> Result<()> {
    let (Some(sid), Some(token), Some(from)) = (
      self.config.account_sid.as_deref(),
      self.config.auth_token.as_deref(),
      self.config.from_number.as_deref(),
    ) else {
      return Err(Error::NotConfigured("Twilio credentials"));
    };

    let url = format!(
      "{}/2010-04-01/Accounts/{sid}/Messages.json",
      self.config.base_url.trim_end_matches('/')
    );
    let resp = self
      .client
      .post(url)
      .basic_auth(sid, Some(token))
      .form(&[("To", to), ("From", from), ("Body", body)])
      .send()
      .await
      .map_err(|source| Error::Http { service: "Twilio", source })?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp.text().await.unwrap_or_default();
      tracing::warn!(%status, %detail, "twilio rejected message");
      return Err(Error::Upstream { service: "Twilio", status });
    }
    Ok(())
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct OtpService<T> {
  sms: T,
}

impl<T: SmsSender> OtpService<T> {
  pub fn new(sms: T) -> Self { Self { sms } }

  /// Text a fresh code to `raw_phone`, replacing any open challenge for that
  /// number. Returns the normalised number.
  pub async fn issue<S: SafetyStore>(
    &self,
    store: &S,
    raw_phone: &str,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let phone = normalize_e164(raw_phone)?;
    let code = generate_code();

    store
      .put_otp_challenge(OtpChallenge {
        phone_number: phone.clone(),
        code_hash:    sha256_hex(&code),
        expires_at:   now + TimeDelta::minutes(OTP_TTL_MINUTES),
        attempts:     0,
      })
      .await
      .map_err(Error::store)?;

    if let Err(e) = self.sms.send(&phone, &sms_body(&code)).await {
      store.delete_otp_challenge(phone).await.map_err(Error::store)?;
      return Err(e);
    }

    tracing::info!(%phone, "otp sent");
    Ok(phone)
  }

  /// Check `code` against the open challenge for `raw_phone`. A match
  /// consumes the challenge and returns the normalised number.
  ///
  /// The attempt is counted before the code is compared, so concurrent
  /// guesses share the same five-attempt allowance.
  pub async fn verify<S: SafetyStore>(
    &self,
    store: &S,
    raw_phone: &str,
    code: &str,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let phone = normalize_e164(raw_phone)?;
    let Some(challenge) = store.claim_otp_attempt(phone.clone()).await.map_err(Error::store)?
    else {
      return Err(Error::OtpRejected(
        "no open verification code for this number, request a new one",
      ));
    };

    if challenge.is_expired(now) {
      store.delete_otp_challenge(phone).await.map_err(Error::store)?;
      return Err(Error::OtpRejected("verification code expired, request a new one"));
    }

    if !code_matches(code, &challenge.code_hash) {
      if challenge.is_exhausted() {
        store.delete_otp_challenge(phone.clone()).await.map_err(Error::store)?;
      }
      tracing::warn!(%phone, attempts = challenge.attempts, "otp mismatch");
      return Err(Error::OtpRejected("incorrect verification code"));
    }

    store.delete_otp_challenge(phone.clone()).await.map_err(Error::store)?;
    Ok(phone)
  }
}

fn code_matches(code: &str, code_hash: &str) -> bool {
  sha256_hex(code.trim()).as_bytes().ct_eq(code_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Form, Router, http::StatusCode, routing::post};
  use safario_store_sqlite::SqliteStore;

  use super::*;

  /// Remembers every message instead of sending it.
  #[derive(Clone, Default)]
  struct Outbox(Arc<Mutex<Vec<(String, String)>>>);

  impl Outbox {
    fn last_code(&self) -> String {
      let sent = self.0.lock().unwrap();
      let body = &sent.last().expect("a message").1;
      body.chars().filter(char::is_ascii_digit).take(6).collect()
    }
  }

  impl SmsSender for Outbox {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
      self.0.lock().unwrap().push((to.to_owned(), body.to_owned()));
      Ok(())
    }
  }

  struct Unreachable;

  impl SmsSender for Unreachable {
    async fn send(&self, _: &str, _: &str) -> Result<()> {
      Err(Error::NotConfigured("Twilio credentials"))
    }
  }

  async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.unwrap() }

  #[test]
  fn e164_normalisation() {
    assert_eq!(normalize_e164("+91 98765-43210").unwrap(), "+919876543210");
    assert!(matches!(normalize_e164("919876543210"), Err(Error::InvalidPhone(_))));
    assert!(matches!(normalize_e164("+12345"), Err(Error::InvalidPhone(_))));
    assert!(matches!(normalize_e164(""), Err(Error::InvalidPhone(_))));
    assert!(normalize_e164("+123456789012345").is_ok());
    assert!(normalize_e164("+1234567890123456").is_err());
  }

  #[test]
  fn codes_are_six_digits() {
    for _ in 0..200 {
      let code = generate_code();
      assert_eq!(code.len(), 6);
      let n: u32 = code.parse().unwrap();
      assert!((100_000..=999_999).contains(&n));
    }
  }

  #[test]
  fn sms_body_names_the_code_and_validity() {
    assert_eq!(
      sms_body("123456"),
      "Your Safario verification code is: 123456. Valid for 10 minutes."
    );
  }

  #[tokio::test]
  async fn correct_code_verifies_once() {
    let s = store().await;
    let outbox = Outbox::default();
    let otp = OtpService::new(outbox.clone());
    let now = Utc::now();

    let phone = otp.issue(&s, "+91 98123 45678", now).await.unwrap();
    assert_eq!(phone, "+919812345678");
    let code = outbox.last_code();

    let stored = s.get_otp_challenge(phone.clone()).await.unwrap().unwrap();
    assert_ne!(stored.code_hash, code);
    assert_eq!(stored.code_hash, sha256_hex(&code));

    assert_eq!(otp.verify(&s, "+919812345678", &code, now).await.unwrap(), phone);
    assert!(matches!(
      otp.verify(&s, "+919812345678", &code, now).await,
      Err(Error::OtpRejected(_))
    ));
  }

  #[tokio::test]
  async fn expired_code_is_rejected() {
    let s = store().await;
    let outbox = Outbox::default();
    let otp = OtpService::new(outbox.clone());
    let issued = Utc::now();

    otp.issue(&s, "+919812345678", issued).await.unwrap();
    let code = outbox.last_code();
    let later = issued + TimeDelta::minutes(OTP_TTL_MINUTES);
    assert!(otp.verify(&s, "+919812345678", &code, later).await.is_err());
  }

  #[tokio::test]
  async fn five_wrong_guesses_burn_the_challenge() {
    let s = store().await;
    let outbox = Outbox::default();
    let otp = OtpService::new(outbox.clone());
    let now = Utc::now();

    otp.issue(&s, "+919812345678", now).await.unwrap();
    let code = outbox.last_code();
    let wrong = if code == "111111" { "222222" } else { "111111" };

    for _ in 0..5 {
      assert!(otp.verify(&s, "+919812345678", wrong, now).await.is_err());
    }
    assert!(otp.verify(&s, "+919812345678", &code, now).await.is_err());
  }

  #[tokio::test]
  async fn parallel_guesses_share_the_attempt_limit() {
    let s = store().await;
    let outbox = Outbox::default();
    let otp = OtpService::new(outbox.clone());
    let now = Utc::now();

    otp.issue(&s, "+919812345678", now).await.unwrap();
    let code = outbox.last_code();
    let mut guesses = tokio::task::JoinSet::new();
    for guess in (100_000..1_000_000u32).map(|n| n.to_string()).filter(|g| *g != code).take(30)
    {
      let (s, otp) = (s.clone(), otp.clone());
      guesses.spawn(async move { otp.verify(&s, "+919812345678", &guess, now).await });
    }
    let results = guesses.join_all().await;
    let compared = results
      .iter()
      .filter(|r| matches!(r, Err(Error::OtpRejected("incorrect verification code"))))
      .count();
    assert_eq!(compared, safario_core::account::MAX_OTP_ATTEMPTS as usize);
    assert!(results.iter().all(Result::is_err));
    assert!(otp.verify(&s, "+919812345678", &code, now).await.is_err());
  }

  #[test]
  fn code_comparison_is_against_the_digest() {
    let hash = sha256_hex("482913");
    assert!(code_matches(" 482913 ", &hash));
    assert!(!code_matches("482914", &hash));
    assert!(!code_matches("482913", "482913"));
  }

  #[tokio::test]
  async fn failed_delivery_leaves_no_challenge() {
    let s = store().await;
    let otp = OtpService::new(Unreachable);
    assert!(otp.issue(&s, "+919812345678", Utc::now()).await.is_err());
    assert!(s.get_otp_challenge("+919812345678".into()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn twilio_receives_form_post() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let sink = seen.clone();
    let router = Router::new().route(
      "/2010-04-01/Accounts/AC123/Messages.json",
      post(move |Form(form): Form<std::collections::HashMap<String, String>>| {
        let sink = sink.clone();
        async move {
          sink.lock().unwrap().push((form["To"].clone(), form["Body"].clone()));
          StatusCode::CREATED
        }
      }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let sender = TwilioSender::new(Client::new(), TwilioConfig {
      account_sid: Some("AC123".into()),
      auth_token:  Some("secret".into()),
      from_number: Some("+15550000000".into()),
      base_url:    format!("http://{addr}"),
    });
    sender.send("+919812345678", "hello").await.unwrap();
    assert_eq!(seen.lock().unwrap()[0], ("+919812345678".to_owned(), "hello".to_owned()));
  }

  #[tokio::test]
  async fn twilio_without_credentials_is_not_configured() {
    let sender = TwilioSender::new(Client::new(), TwilioConfig::default());
    assert!(matches!(sender.send("+919812345678", "x").await, Err(Error::NotConfigured(_))));
  }
}
