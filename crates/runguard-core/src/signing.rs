//! Detached stdin signatures in minisign encoding.
//!
//! The trusted key is an Ed25519 public key whose private half is held
//! offline by an operator. Payload signatures are produced with `minisign`
//! and travel next to the payload; nothing secret lives on the serving host.
//!
//! # Wire format
//!
//! ```text
//! public key:  base64( "Ed" || key_id[8] || ed25519_pk[32] )
//!
//! signature:   untrusted comment: <free text>
//!              base64( alg[2] || key_id[8] || ed25519_sig[64] )
//!              trusted comment: <free text>
//!              base64( ed25519_sig(sig[64] || trusted_comment)[64] )
//! ```
//!
//! `alg` is `Ed` (signature over the raw payload) or `ED` (signature over
//! the BLAKE2b-512 digest of the payload).

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use blake2::{Blake2b512, Digest};
use ed25519_dalek::{Signature, VerifyingKey};

/// Algorithm tag for signatures over the raw payload.
pub const ALG_PURE: [u8; 2] = *b"Ed";

/// Algorithm tag for signatures over the BLAKE2b-512 digest of the payload.
pub const ALG_PREHASHED: [u8; 2] = *b"ED";

const KEY_ID_LEN: usize = 8;
const PUBLIC_KEY_LEN: usize = 2 + KEY_ID_LEN + 32;
const SIGNATURE_LEN: usize = 2 + KEY_ID_LEN + 64;

const UNTRUSTED_PREFIX: &str = "untrusted comment:";
const TRUSTED_PREFIX: &str = "trusted comment: ";

/// Signature verification errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Signature bytes could not be decoded.
    #[error("malformed signature: {reason}")]
    Malformed { reason: String },

    /// Signature was produced by a different key.
    #[error("key id mismatch: signed with {signature_key_id}, trusted key is {trusted_key_id}")]
    KeyIdMismatch {
        signature_key_id: String,
        trusted_key_id: String,
    },

    /// Signature does not verify over the payload bytes.
    #[error("ed25519 verification failed")]
    Invalid,

    /// The global signature over the trusted comment does not verify.
    #[error("trusted comment signature verification failed")]
    TrustedCommentInvalid,
}

impl SignatureError {
    /// Whether the failure is a decoding problem rather than a bad signature.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Public-key verification of a detached signature over a byte payload.
pub trait SignatureVerifier: Send + Sync + fmt::Debug {
    /// Verify `signature` (encoded bytes as received) over `payload`.
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<(), SignatureError>;
}

/// Error returned when a public key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid minisign public key: {reason}")]
pub struct PublicKeyError {
    pub reason: String,
}

/// A trusted minisign public key.
#[derive(Clone, PartialEq, Eq)]
pub struct MinisignPublicKey {
    key_id: [u8; KEY_ID_LEN],
    key: VerifyingKey,
}

impl MinisignPublicKey {
    /// Build from raw parts.
    #[must_use]
    pub fn new(key_id: [u8; KEY_ID_LEN], key: VerifyingKey) -> Self {
        Self { key_id, key }
    }

    /// Parse either the bare base64 line (`RW...`) or the full `.pub` file
    /// contents including its `untrusted comment:` line.
    pub fn parse(text: &str) -> Result<Self, PublicKeyError> {
        let line = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with(UNTRUSTED_PREFIX))
            .ok_or_else(|| key_error("no key material"))?;

        let bytes = BASE64
            .decode(line)
            .map_err(|e| key_error(format!("invalid base64: {e}")))?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(key_error(format!(
                "expected {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[..2] != ALG_PURE {
            return Err(key_error("unsupported key algorithm"));
        }

        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&bytes[2..2 + KEY_ID_LEN]);
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&bytes[2 + KEY_ID_LEN..]);
        let key = VerifyingKey::from_bytes(&pk)
            .map_err(|e| key_error(format!("invalid ed25519 point: {e}")))?;

        Ok(Self { key_id, key })
    }

    /// Key id as displayed by `minisign` (uppercase hex of the little-endian id).
    #[must_use]
    pub fn key_id(&self) -> String {
        format_key_id(&self.key_id)
    }

    /// Base64 encoding suitable for configuration files.
    #[must_use]
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_LEN);
        bytes.extend_from_slice(&ALG_PURE);
        bytes.extend_from_slice(&self.key_id);
        bytes.extend_from_slice(self.key.as_bytes());
        BASE64.encode(bytes)
    }

    /// Verify a parsed signature over the exact payload bytes.
    pub fn verify_detached(
        &self,
        payload: &[u8],
        signature: &MinisignSignature,
    ) -> Result<(), SignatureError> {
        if signature.key_id != self.key_id {
            return Err(SignatureError::KeyIdMismatch {
                signature_key_id: format_key_id(&signature.key_id),
                trusted_key_id: self.key_id(),
            });
        }

        let message: Cow<'_, [u8]> = if signature.algorithm == ALG_PREHASHED {
            Cow::Owned(Blake2b512::digest(payload).to_vec())
        } else {
            Cow::Borrowed(payload)
        };

        self.key
            .verify_strict(&message, &signature.signature)
            .map_err(|_| SignatureError::Invalid)?;

        let mut global = Vec::with_capacity(64 + signature.trusted_comment.len());
        global.extend_from_slice(&signature.signature.to_bytes());
        global.extend_from_slice(signature.trusted_comment.as_bytes());
        self.key
            .verify_strict(&global, &signature.global_signature)
            .map_err(|_| SignatureError::TrustedCommentInvalid)
    }
}

impl SignatureVerifier for MinisignPublicKey {
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        let parsed = MinisignSignature::parse(signature)?;
        self.verify_detached(payload, &parsed)
    }
}

impl FromStr for MinisignPublicKey {
    type Err = PublicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for MinisignPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinisignPublicKey")
            .field("key_id", &self.key_id())
            .finish()
    }
}

/// A decoded minisign signature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinisignSignature {
    algorithm: [u8; 2],
    key_id: [u8; KEY_ID_LEN],
    signature: Signature,
    trusted_comment: String,
    global_signature: Signature,
}

impl MinisignSignature {
    /// Decode the four-line signature file. A trailing newline is accepted;
    /// anything else after the global signature is not.
    pub fn parse(bytes: &[u8]) -> Result<Self, SignatureError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| SignatureError::malformed("signature is not UTF-8"))?;
        let lines: Vec<&str> = text
            .trim_end_matches(['\r', '\n'])
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();

        let [untrusted, sig_line, trusted, global_line] = lines.as_slice() else {
            return Err(SignatureError::malformed(format!(
                "expected 4 lines, got {}",
                lines.len()
            )));
        };

        if !untrusted.starts_with(UNTRUSTED_PREFIX) {
            return Err(SignatureError::malformed("missing untrusted comment"));
        }

        let raw = BASE64
            .decode(sig_line.trim())
            .map_err(|e| SignatureError::malformed(format!("invalid base64 signature: {e}")))?;
        if raw.len() != SIGNATURE_LEN {
            return Err(SignatureError::malformed(format!(
                "expected {SIGNATURE_LEN} signature bytes, got {}",
                raw.len()
            )));
        }

        let algorithm = [raw[0], raw[1]];
        if algorithm != ALG_PURE && algorithm != ALG_PREHASHED {
            return Err(SignatureError::malformed("unsupported signature algorithm"));
        }
        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&raw[2..2 + KEY_ID_LEN]);
        let signature = Signature::from_slice(&raw[2 + KEY_ID_LEN..])
            .map_err(|e| SignatureError::malformed(format!("invalid signature bytes: {e}")))?;

        let trusted_comment = trusted
            .strip_prefix(TRUSTED_PREFIX)
            .ok_or_else(|| SignatureError::malformed("missing trusted comment"))?
            .to_string();

        let global_raw = BASE64.decode(global_line.trim()).map_err(|e| {
            SignatureError::malformed(format!("invalid base64 global signature: {e}"))
        })?;
        let global_signature = Signature::from_slice(&global_raw).map_err(|e| {
            SignatureError::malformed(format!("invalid global signature bytes: {e}"))
        })?;

        Ok(Self {
            algorithm,
            key_id,
            signature,
            trusted_comment,
            global_signature,
        })
    }

    /// Key id of the signing key.
    #[must_use]
    pub fn key_id(&self) -> String {
        format_key_id(&self.key_id)
    }

    #[must_use]
    pub fn is_prehashed(&self) -> bool {
        self.algorithm == ALG_PREHASHED
    }

    /// The signed trusted comment. Only meaningful after verification.
    #[must_use]
    pub fn trusted_comment(&self) -> &str {
        &self.trusted_comment
    }
}

fn format_key_id(key_id: &[u8; KEY_ID_LEN]) -> String {
    format!("{:016X}", u64::from_le_bytes(*key_id))
}

fn key_error(reason: impl Into<String>) -> PublicKeyError {
    PublicKeyError {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    const KEY_ID: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    fn keypair() -> (SigningKey, MinisignPublicKey) {
        let signing = SigningKey::generate(&mut rand::rngs::OsRng);
        let public = MinisignPublicKey::new(KEY_ID, signing.verifying_key());
        (signing, public)
    }

    fn sign(signing: &SigningKey, alg: [u8; 2], payload: &[u8], comment: &str) -> String {
        let message = if alg == ALG_PREHASHED {
            Blake2b512::digest(payload).to_vec()
        } else {
            payload.to_vec()
        };
        let sig = signing.sign(&message);

        let mut raw = Vec::new();
        raw.extend_from_slice(&alg);
        raw.extend_from_slice(&KEY_ID);
        raw.extend_from_slice(&sig.to_bytes());

        let mut global = sig.to_bytes().to_vec();
        global.extend_from_slice(comment.as_bytes());
        let global_sig = signing.sign(&global);

        format!(
            "untrusted comment: signature from minisign secret key\n{}\ntrusted comment: {}\n{}\n",
            BASE64.encode(raw),
            comment,
            BASE64.encode(global_sig.to_bytes())
        )
    }

    #[test]
    fn test_public_key_roundtrip_through_pub_file() {
        let (_, public) = keypair();
        let file = format!(
            "untrusted comment: minisign public key {}\n{}\n",
            public.key_id(),
            public.to_base64()
        );
        let parsed = MinisignPublicKey::parse(&file).unwrap();
        assert_eq!(parsed, public);
        assert_eq!(parsed.key_id(), "0807060504030201");
    }

    #[test]
    fn test_known_public_key_parses() {
        const KNOWN: &str = "RWTV8L06+shYI7Xw1H+NBGmsUYlbEkbrdYxr4c0ImLCAr8NGx75VhxGQ";
        let key = MinisignPublicKey::parse(KNOWN).unwrap();
        assert_eq!(key.to_base64(), KNOWN);
    }

    #[test]
    fn test_public_key_rejects_garbage() {
        assert!(MinisignPublicKey::parse("").is_err());
        assert!(MinisignPublicKey::parse("not base64 !!").is_err());
        assert!(MinisignPublicKey::parse(&BASE64.encode([0u8; 10])).is_err());

        let mut wrong_alg = vec![b'X', b'X'];
        wrong_alg.extend_from_slice(&[0u8; 40]);
        let err = MinisignPublicKey::parse(&BASE64.encode(wrong_alg)).unwrap_err();
        assert!(err.reason.contains("algorithm"));
    }

    #[test]
    fn test_pure_and_prehashed_signatures_verify() {
        let (signing, public) = keypair();
        let payload = b"start-sleep 1";
        for alg in [ALG_PURE, ALG_PREHASHED] {
            let sig = sign(&signing, alg, payload, "timestamp:1700000000");
            public.verify(payload, sig.as_bytes()).unwrap();

            let parsed = MinisignSignature::parse(sig.as_bytes()).unwrap();
            assert_eq!(parsed.is_prehashed(), alg == ALG_PREHASHED);
            assert_eq!(parsed.trusted_comment(), "timestamp:1700000000");
        }
    }

    #[test]
    fn test_crlf_line_endings_accepted() {
        let (signing, public) = keypair();
        let sig = sign(&signing, ALG_PURE, b"payload", "c").replace('\n', "\r\n");
        public.verify(b"payload", sig.as_bytes()).unwrap();
    }

    #[test]
    fn test_payload_is_not_normalised() {
        let (signing, public) = keypair();
        let sig = sign(&signing, ALG_PURE, b"echo hi", "c");
        assert_eq!(
            public.verify(b"echo hi\n", sig.as_bytes()),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            public.verify(b" echo hi", sig.as_bytes()),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_foreign_key_reports_key_id_mismatch() {
        let (signing, _) = keypair();
        let other = MinisignPublicKey::new([9; 8], signing.verifying_key());
        let sig = sign(&signing, ALG_PURE, b"payload", "c");
        assert!(matches!(
            other.verify(b"payload", sig.as_bytes()),
            Err(SignatureError::KeyIdMismatch { .. })
        ));
    }

    #[test]
    fn test_same_key_id_different_key_is_invalid() {
        let (signing, _) = keypair();
        let (_, imposter) = keypair();
        let sig = sign(&signing, ALG_PURE, b"payload", "c");
        assert_eq!(
            imposter.verify(b"payload", sig.as_bytes()),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_tampered_trusted_comment_rejected() {
        let (signing, public) = keypair();
        let sig = sign(&signing, ALG_PURE, b"payload", "timestamp:1")
            .replace("timestamp:1", "timestamp:2");
        assert_eq!(
            public.verify(b"payload", sig.as_bytes()),
            Err(SignatureError::TrustedCommentInvalid)
        );
    }

    #[test]
    fn test_malformed_signatures() {
        let (signing, public) = keypair();
        let good = sign(&signing, ALG_PURE, b"payload", "c");
        let lines: Vec<&str> = good.lines().collect();

        let cases = [
            Vec::new(),
            b"garbage".to_vec(),
            vec![0xff, 0xfe, 0xfd],
            lines[..2].join("\n").into_bytes(),
            format!("comment\n{}\n{}\n{}", lines[1], lines[2], lines[3]).into_bytes(),
            format!("{}\n!!!\n{}\n{}", lines[0], lines[2], lines[3]).into_bytes(),
            format!("{}\n{}\ncomment\n{}", lines[0], lines[1], lines[3]).into_bytes(),
            format!("{good}extra line\n").into_bytes(),
        ];
        for case in cases {
            let err = public.verify(b"payload", &case).unwrap_err();
            assert!(err.is_malformed(), "expected malformed, got {err:?}");
        }
    }
}
