//! PEM text to DER bytes

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::tls::errors::TlsError;

/// Lines starting with this prefix are boundary markers, not body
const BOUNDARY_PREFIX: &str = "--";

/// Decode a single PEM certificate block into DER bytes
///
/// Boundary lines (`-----BEGIN ...-----` / `-----END ...-----`) are dropped,
/// the remaining lines are concatenated and base64-decoded. Text without any
/// boundary lines is treated as a bare base64 body.
///
/// Only one block is supported. Bundles holding several certificates are
/// rejected rather than decoded into a concatenation of unrelated DER.
///
/// # Errors
///
/// Returns [`TlsError::MalformedEncoding`] when the body is empty, is not
/// valid base64, or the input holds more than one `BEGIN` boundary.
pub fn decode_pem(text: &str) -> Result<Vec<u8>, TlsError> {
    let mut body = String::with_capacity(text.len());
    let mut blocks = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with(BOUNDARY_PREFIX) {
            if line.contains("BEGIN") {
                blocks += 1;
            }
            continue;
        }
        body.push_str(line);
    }

    if blocks > 1 {
        return Err(TlsError::MalformedEncoding(format!(
            "found {blocks} PEM blocks; only a single certificate block is supported"
        )));
    }
    if body.is_empty() {
        return Err(TlsError::MalformedEncoding(
            "PEM input has no base64 body".to_string(),
        ));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| TlsError::MalformedEncoding(format!("invalid base64 body: {e}")))?;

    tracing::debug!("Decoded PEM block into {} DER bytes", der.len());
    Ok(der)
}

/// Wrap DER bytes in a PEM `CERTIFICATE` block
#[must_use]
pub fn encode_pem(der: &[u8]) -> String {
    pem::encode(&pem::Pem::new("CERTIFICATE", der.to_vec()))
}
