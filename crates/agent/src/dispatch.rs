//! Dispatch client. Forwards confirmed registrations to the external
//! workflow endpoint.
//!
//! Dispatch never fails the turn: every branch is reported as a
//! [`DispatchOutcome`] in the response envelope.

use asika_config::DispatchConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::marker::PatientRecord;

/// Header carrying the record's idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Which branch a registration marker took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// No marker in the reply.
    NotTriggered,
    /// Marker present, payload undecodable.
    ParseFailed,
    /// Required fields are still null.
    MissingFields,
    /// No endpoint configured.
    NotConfigured,
    /// Same record already delivered inside the dedup window.
    Duplicate,
    /// Endpoint answered 2xx.
    Delivered,
    /// Endpoint answered non-2xx.
    Rejected,
    /// Timeout, refused connection, DNS failure.
    TransportFailed,
}

/// The `rpa` field of a chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    pub attempted: bool,
    pub remapped_body: Option<PatientRecord>,
    pub http_status: Option<u16>,
    pub succeeded: bool,
    pub error_detail: Option<String>,
    pub raw_payload: Option<String>,
    pub response_body: Option<String>,
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

impl DispatchOutcome {
    fn base(status: DispatchStatus) -> Self {
        Self {
            status,
            attempted: false,
            remapped_body: None,
            http_status: None,
            succeeded: false,
            error_detail: None,
            raw_payload: None,
            response_body: None,
            idempotency_key: None,
            missing_fields: Vec::new(),
        }
    }

    pub fn not_triggered() -> Self {
        Self::base(DispatchStatus::NotTriggered)
    }

    /// Marker present but unusable. Counted as an attempt; nothing is sent.
    pub fn parse_failed(raw_payload: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            attempted: true,
            raw_payload: Some(raw_payload.into()),
            error_detail: Some(detail.into()),
            ..Self::base(DispatchStatus::ParseFailed)
        }
    }

    pub fn missing_fields(record: PatientRecord, missing: Vec<String>) -> Self {
        Self {
            error_detail: Some(format!(
                "Registration not sent; missing required fields: {}",
                missing.join(", ")
            )),
            idempotency_key: Some(idempotency_key(&record)),
            remapped_body: Some(record),
            missing_fields: missing,
            ..Self::base(DispatchStatus::MissingFields)
        }
    }
}

impl Default for DispatchOutcome {
    fn default() -> Self {
        Self::not_triggered()
    }
}

/// SHA-256 hex digest of the serialized record.
pub fn idempotency_key(record: &PatientRecord) -> String {
    let body = serde_json::to_vec(record).unwrap_or_default();
    hex::encode(Sha256::digest(&body))
}

/// Dedup ledger entry for one idempotency key.
#[derive(Debug, Clone, Copy)]
enum Claim {
    InFlight,
    Delivered(Instant),
}

type Ledger = Mutex<HashMap<String, Claim>>;

/// An in-flight claim on a key. Released on drop unless confirmed.
struct Reservation<'a> {
    ledger: &'a Ledger,
    key: String,
    confirmed: bool,
}

impl Reservation<'_> {
    fn confirm(mut self) {
        self.confirmed = true;
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key.clone(), Claim::Delivered(Instant::now()));
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.confirmed {
            self.ledger
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.key);
        }
    }
}

enum Admission<'a> {
    /// No dedup window configured.
    Unguarded,
    Reserved(Reservation<'a>),
    /// Delivered inside the window, or another turn is sending it now.
    Duplicate,
}

/// POSTs `{"patientData": record}` to the configured endpoint, once.
pub struct DispatchClient {
    client: reqwest::Client,
    url: Option<String>,
    dedup_window: Option<Duration>,
    ledger: Ledger,
}

impl DispatchClient {
    pub fn new(
        url: Option<String>,
        timeout: Duration,
        dedup_window: Option<Duration>,
    ) -> Result<Self, asika_core::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| asika_core::Error::Config {
                message: format!("dispatch HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            dedup_window: dedup_window.filter(|w| !w.is_zero()),
            ledger: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, asika_core::Error> {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            Some(Duration::from_secs(config.dedup_window_secs)),
        )
    }

    /// A client with no endpoint. Every dispatch reports `not_configured`.
    pub fn disabled() -> Result<Self, asika_core::Error> {
        Self::new(None, Duration::from_secs(10), None)
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub async fn dispatch(&self, record: PatientRecord) -> DispatchOutcome {
        let key = idempotency_key(&record);

        let Some(url) = &self.url else {
            warn!("Registration marker received but no dispatch URL is configured");
            return DispatchOutcome {
                remapped_body: Some(record),
                idempotency_key: Some(key),
                error_detail: Some(
                    "Dispatch endpoint is not configured; registration was not sent".into(),
                ),
                ..DispatchOutcome::base(DispatchStatus::NotConfigured)
            };
        };

        let reservation = match self.admit(&key) {
            Admission::Unguarded => None,
            Admission::Reserved(reservation) => Some(reservation),
            Admission::Duplicate => {
                info!(key = %key, "Suppressing duplicate registration dispatch");
                return DispatchOutcome {
                    remapped_body: Some(record),
                    idempotency_key: Some(key),
                    error_detail: Some(
                        "Identical registration already delivered or in flight".into(),
                    ),
                    ..DispatchOutcome::base(DispatchStatus::Duplicate)
                };
            }
        };

        let body = serde_json::json!({ "patientData": &record });
        let result = self
            .client
            .post(url)
            .header(IDEMPOTENCY_HEADER, &key)
            .json(&body)
            .send()
            .await;

        let mut outcome = DispatchOutcome {
            attempted: true,
            remapped_body: Some(record),
            idempotency_key: Some(key.clone()),
            ..DispatchOutcome::base(DispatchStatus::TransportFailed)
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Registration dispatch failed in transport");
                outcome.error_detail = Some(format!("Dispatch request failed: {e}"));
                return outcome;
            }
        };

        let status = response.status();
        outcome.http_status = Some(status.as_u16());
        outcome.response_body = response.text().await.ok();

        if status.is_success() {
            info!(status = status.as_u16(), "Registration delivered");
            outcome.status = DispatchStatus::Delivered;
            outcome.succeeded = true;
            if let Some(reservation) = reservation {
                reservation.confirm();
            }
        } else {
            warn!(status = status.as_u16(), "Registration rejected by workflow endpoint");
            outcome.status = DispatchStatus::Rejected;
            outcome.error_detail = Some(format!("Workflow endpoint returned HTTP {status}"));
        }

        outcome
    }

    /// Check and claim `key` under one lock acquisition.
    fn admit(&self, key: &str) -> Admission<'_> {
        let Some(window) = self.dedup_window else {
            return Admission::Unguarded;
        };
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.retain(|_, claim| match claim {
            Claim::InFlight => true,
            Claim::Delivered(at) => at.elapsed() < window,
        });
        if ledger.contains_key(key) {
            return Admission::Duplicate;
        }
        ledger.insert(key.to_string(), Claim::InFlight);
        Admission::Reserved(Reservation {
            ledger: &self.ledger,
            key: key.to_string(),
            confirmed: false,
        })
    }
}
