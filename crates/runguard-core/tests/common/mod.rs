#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::CertificateDer;

use runguard_core::policy::{AllowlistPolicy, ArgumentSequences, NetworkPolicy};
use runguard_core::{
    ClientCertificates, CommandPolicy, ExpectedCredentials, MinisignPublicKey, StdinSignatures,
    TrustConfiguration,
};

pub const USERNAME: &str = "test";
pub const PASSWORD: &str = "secret";
pub const KEY_ID: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

/// Open configuration: loopback only, no mTLS, no signatures, permissive
/// commands. Tests override the piece they exercise.
pub fn base_config() -> TrustConfiguration {
    TrustConfiguration {
        allowed_networks: NetworkPolicy::parse(&["127.0.0.0/8"]).unwrap(),
        client_certificates: ClientCertificates::NotRequired,
        credentials: ExpectedCredentials::new(USERNAME, PASSWORD),
        stdin_signatures: StdinSignatures::NotRequired,
        command_policy: CommandPolicy::Permissive,
    }
}

pub fn allowlist(entries: Vec<(&str, Vec<Vec<&str>>)>) -> CommandPolicy {
    let mut table = ArgumentSequences::new();
    for (exe, sequences) in entries {
        table.insert(
            exe.to_string(),
            sequences
                .into_iter()
                .map(|seq| seq.into_iter().map(str::to_string).collect())
                .collect(),
        );
    }
    CommandPolicy::Enforced(AllowlistPolicy::compile(&table).unwrap())
}

pub struct Signer25519 {
    pub signing: SigningKey,
    pub public: MinisignPublicKey,
}

impl Signer25519 {
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut rand::rngs::OsRng);
        let public = MinisignPublicKey::new(KEY_ID, signing.verifying_key());
        Self { signing, public }
    }

    /// Raw 64-byte Ed25519 signature over `payload`.
    pub fn raw(&self, payload: &[u8]) -> [u8; 64] {
        self.signing.sign(payload).to_bytes()
    }

    /// Minisign signature file text using the pure `Ed` algorithm.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.encode(&self.raw(payload), "timestamp:1700000000")
    }

    /// Encode an arbitrary (possibly corrupted) raw signature as a minisign
    /// file with a correctly signed trusted comment.
    pub fn encode(&self, sig: &[u8; 64], comment: &str) -> String {
        let mut line = Vec::with_capacity(74);
        line.extend_from_slice(b"Ed");
        line.extend_from_slice(&KEY_ID);
        line.extend_from_slice(sig);

        let mut global = sig.to_vec();
        global.extend_from_slice(comment.as_bytes());
        let global_sig = self.signing.sign(&global);

        format!(
            "untrusted comment: signature from minisign secret key\n{}\ntrusted comment: {}\n{}\n",
            BASE64.encode(line),
            comment,
            BASE64.encode(global_sig.to_bytes())
        )
    }
}

pub struct TestCa {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.distinguished_name.push(DnType::CommonName, name);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    /// Sub-CA signed by this CA.
    pub fn intermediate(&self, name: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.distinguished_name.push(DnType::CommonName, name);
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        Self { cert, key }
    }

    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Issue a client-auth certificate with the default (very wide)
    /// validity window.
    pub fn issue_client(&self, name: &str) -> Vec<CertificateDer<'static>> {
        self.issue_with(name, |_| {})
    }

    pub fn issue_with(
        &self,
        name: &str,
        adjust: impl FnOnce(&mut CertificateParams),
    ) -> Vec<CertificateDer<'static>> {
        let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, name);
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        adjust(&mut params);
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        vec![cert.der().clone()]
    }
}
