//! Bounded form body reading
//!
//! Unsafe requests carrying a url-encoded or multipart form are buffered so
//! the token field can be read, then handed on with the same bytes.

use bytes::Bytes;
use csrf_guard_core::{CsrfGuard, FormFields};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::convert::Infallible;
use tower::BoxError;

/// Default limit for buffered form bodies: 1MB
pub const DEFAULT_FORM_LIMIT: usize = 1024 * 1024;

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// How a buffered body is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormEncoding {
    UrlEncoded,
    Multipart { boundary: String },
}

impl FormEncoding {
    /// Pick the decoder for an unsafe form request, if any.
    pub(crate) fn detect(guard: &CsrfGuard, parts: &Parts) -> Option<Self> {
        if !guard.config().classify(&parts.method).is_unsafe() {
            return None;
        }

        let content_type = parts.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let mime = content_type.split(';').next().unwrap_or_default().trim();

        if mime.eq_ignore_ascii_case(URLENCODED) {
            Some(Self::UrlEncoded)
        } else if mime.eq_ignore_ascii_case(MULTIPART) {
            match multer::parse_boundary(content_type) {
                Ok(boundary) => Some(Self::Multipart { boundary }),
                Err(e) => {
                    tracing::debug!(error = %e, "multipart request without usable boundary");
                    None
                }
            }
        } else {
            None
        }
    }

    /// Decode the fields. Malformed input yields no fields.
    pub(crate) async fn parse(self, bytes: Bytes) -> FormFields {
        match self {
            Self::UrlEncoded => FormFields::parse(&bytes),
            Self::Multipart { boundary } => match multipart_fields(bytes, boundary).await {
                Ok(fields) => fields,
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring malformed multipart body");
                    FormFields::default()
                }
            },
        }
    }
}

/// Text fields of a multipart body. File parts are skipped.
async fn multipart_fields(bytes: Bytes, boundary: String) -> Result<FormFields, multer::Error> {
    let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        fields.push((name, field.text().await?));
    }

    Ok(fields.into_iter().collect())
}

/// Why a body could not be buffered.
#[derive(Debug)]
pub(crate) enum BufferError {
    /// The body is larger than the configured limit.
    TooLarge,
    /// The body stream failed.
    Body(BoxError),
}

/// Declared `Content-Length`, if present and numeric.
pub(crate) fn content_length(parts: &Parts) -> Option<usize> {
    parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
}

/// Read the whole body, failing once more than `limit` bytes arrive.
pub(crate) async fn buffer_body<B>(
    body: B,
    declared: Option<usize>,
    limit: usize,
) -> Result<Bytes, BufferError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if declared.map_or(false, |len| len > limit) {
        return Err(BufferError::TooLarge);
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(BufferError::TooLarge),
        Err(e) => Err(BufferError::Body(e)),
    }
}
