//! Success/error envelopes
//!
//! Every handler result is wrapped in an [`Envelope`] before it is serialized
//! to a JSON output surface.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SerializedError};

/// Request metadata stamped on every envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub request_id: String,
    /// ISO-8601 UTC timestamp with millisecond precision
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// `{ok: true, data, meta}` or `{ok: false, error, meta}`
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success { data: T, meta: EnvelopeMeta },
    Error { error: SerializedError, meta: EnvelopeMeta },
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn meta(&self) -> &EnvelopeMeta {
        match self {
            Envelope::Success { meta, .. } | Envelope::Error { meta, .. } => meta,
        }
    }
}

#[derive(Deserialize)]
struct EnvelopeRepr<T> {
    ok: bool,
    data: Option<T>,
    error: Option<SerializedError>,
    meta: EnvelopeMeta,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct SuccessRepr<'a, T> {
            ok: bool,
            data: &'a T,
            meta: &'a EnvelopeMeta,
        }
        #[derive(Serialize)]
        struct ErrorRepr<'a> {
            ok: bool,
            error: &'a SerializedError,
            meta: &'a EnvelopeMeta,
        }

        match self {
            Envelope::Success { data, meta } => SuccessRepr {
                ok: true,
                data,
                meta,
            }
            .serialize(serializer),
            Envelope::Error { error, meta } => ErrorRepr {
                ok: false,
                error,
                meta,
            }
            .serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error as _;

        let repr = EnvelopeRepr::<T>::deserialize(deserializer)?;
        match (repr.ok, repr.data, repr.error) {
            (true, Some(data), _) => Ok(Envelope::Success {
                data,
                meta: repr.meta,
            }),
            (false, _, Some(error)) => Ok(Envelope::Error {
                error,
                meta: repr.meta,
            }),
            (true, None, _) => Err(D::Error::missing_field("data")),
            (false, _, None) => Err(D::Error::missing_field("error")),
        }
    }
}

/// Overrides for [`to_envelope`]
#[derive(Debug, Clone, Default)]
pub struct EnvelopeOptions {
    /// Request id to stamp; a fresh v4 id when `None`
    pub request_id: Option<String>,
    pub duration_ms: Option<u64>,
}

impl EnvelopeOptions {
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wrap a handler result.
pub fn to_envelope<T>(result: Result<T>, options: EnvelopeOptions) -> Envelope<T> {
    let meta = EnvelopeMeta {
        request_id: options
            .request_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        timestamp: now_iso8601(),
        duration_ms: options.duration_ms,
    };

    match result {
        Ok(data) => Envelope::Success { data, meta },
        Err(error) => Envelope::Error {
            error: error.serialize_error(),
            meta,
        },
    }
}

/// HTTP-style response for bridges that speak HTTP
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponse<T> {
    pub status: u16,
    pub body: Envelope<T>,
}

/// Wrap a handler result with its HTTP status: 200 on success, otherwise the
/// status of the error's category.
pub fn to_http_response<T>(result: Result<T>, options: EnvelopeOptions) -> HttpResponse<T> {
    let status = match &result {
        Ok(_) => 200,
        Err(err) => err.http_status(),
    };
    HttpResponse {
        status,
        body: to_envelope(result, options),
    }
}
