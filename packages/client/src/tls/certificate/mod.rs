//! Certificate codec
//!
//! Turns textual (PEM) and binary (DER) certificate material into
//! [`X509Certificate`](crate::tls::types::X509Certificate) values:
//! - PEM boundary stripping and base64 decoding
//! - DER parsing into subject/issuer/validity/public-key fields

pub mod codec;
pub mod parser;

pub use codec::{decode_pem, encode_pem};
pub use parser::{parse_certificate, read_certificate};
