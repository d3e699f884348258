//! Client certificate validation against generated CAs.

mod common;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{base_config, TestCa, PASSWORD, USERNAME};
use rustls::pki_types::CertificateDer;
use runguard_core::{
    reason_codes, AuthorizationPipeline, ClientCertificateTrust, ClientCertificates,
    ExecutionRequest, Stage,
};

fn pipeline_trusting(ca: &TestCa) -> AuthorizationPipeline {
    let mut config = base_config();
    let trust = ClientCertificateTrust::from_pem(ca.pem().as_bytes()).unwrap();
    assert_eq!(trust.anchors(), 1);
    config.client_certificates = ClientCertificates::Required(trust);
    AuthorizationPipeline::new(config)
}

fn request(chain: Option<Vec<CertificateDer<'static>>>) -> ExecutionRequest {
    let builder = ExecutionRequest::builder("127.0.0.1".parse().unwrap(), "uptime")
        .basic_auth(USERNAME, PASSWORD);
    match chain {
        Some(chain) => builder.client_certificate(chain).build(),
        None => builder.build(),
    }
}

#[test]
fn test_certificate_from_trusted_ca_accepted() {
    let ca = TestCa::new("runguard test CA");
    let pipeline = pipeline_trusting(&ca);
    let decision = pipeline.authorize(&request(Some(ca.issue_client("client.test"))));
    assert!(decision.is_allowed(), "{decision:?}");
}

#[test]
fn test_chain_through_intermediate_requires_the_intermediate() {
    let root = TestCa::new("runguard root CA");
    let issuing = root.intermediate("runguard issuing CA");
    let pipeline = pipeline_trusting(&root);

    let leaf = issuing.issue_client("client.test");
    let mut chain = leaf.clone();
    chain.push(issuing.der());
    let decision = pipeline.authorize(&request(Some(chain)));
    assert!(decision.is_allowed(), "{decision:?}");

    let decision = pipeline.authorize(&request(Some(leaf)));
    let denial = decision.denial().unwrap();
    assert_eq!(denial.stage, Stage::Transport);
    assert_eq!(denial.reason_code, reason_codes::T_CERT_REJECTED);
}

#[test]
fn test_missing_certificate_denied() {
    let ca = TestCa::new("runguard test CA");
    let decision = pipeline_trusting(&ca).authorize(&request(None));
    let denial = decision.denial().unwrap();
    assert_eq!(denial.stage, Stage::Transport);
    assert_eq!(denial.reason_code, reason_codes::T_CERT_MISSING);
    assert_eq!(decision.http_status(), 401);
}

#[test]
fn test_certificate_from_other_ca_denied() {
    let trusted = TestCa::new("trusted CA");
    let rogue = TestCa::new("rogue CA");
    let decision =
        pipeline_trusting(&trusted).authorize(&request(Some(rogue.issue_client("client.test"))));
    let denial = decision.denial().unwrap();
    assert_eq!(denial.stage, Stage::Transport);
    assert_eq!(denial.reason_code, reason_codes::T_CERT_REJECTED);
}

#[test]
fn test_certificate_outside_validity_window_denied() {
    let ca = TestCa::new("runguard test CA");
    let pipeline = pipeline_trusting(&ca);

    let future = ca.issue_with("future.test", |params| {
        params.not_before = rcgen::date_time_ymd(2090, 1, 1);
        params.not_after = rcgen::date_time_ymd(2091, 1, 1);
    });
    let denial = pipeline.authorize(&request(Some(future))).denial().cloned().unwrap();
    assert_eq!(denial.reason_code, reason_codes::T_CERT_REJECTED);

    let expired = ca.issue_with("expired.test", |params| {
        params.not_before = rcgen::date_time_ymd(2000, 1, 1);
        params.not_after = rcgen::date_time_ymd(2001, 1, 1);
    });
    let denial = pipeline.authorize(&request(Some(expired))).denial().cloned().unwrap();
    assert_eq!(denial.reason_code, reason_codes::T_CERT_REJECTED);
}

#[test]
fn test_validity_is_judged_at_receive_time() {
    let ca = TestCa::new("runguard test CA");
    let pipeline = pipeline_trusting(&ca);
    let chain = ca.issue_with("window.test", |params| {
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2021, 1, 1);
    });

    let inside = UNIX_EPOCH + Duration::from_secs(1_593_561_600); // 2020-07-01
    let request_at = |at: SystemTime| {
        ExecutionRequest::builder("127.0.0.1".parse().unwrap(), "uptime")
            .basic_auth(USERNAME, PASSWORD)
            .client_certificate(chain.clone())
            .received_at(at)
            .build()
    };
    assert!(pipeline.authorize(&request_at(inside)).is_allowed());
    assert_eq!(
        pipeline.authorize(&request_at(SystemTime::now())).stage(),
        Some(Stage::Transport)
    );
}

#[test]
fn test_presented_certificate_ignored_when_not_required() {
    let rogue = TestCa::new("rogue CA");
    let pipeline = AuthorizationPipeline::new(base_config());
    let decision = pipeline.authorize(&request(Some(rogue.issue_client("client.test"))));
    assert!(decision.is_allowed());
}
