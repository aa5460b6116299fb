use astrobadge_core::{canonical::signing_payload, SignedReport};
use astrobadge_verifier::{
    key_fingerprint, parse_public_key, parse_signing_key, sign_report, Ed25519ReportVerifier,
    ReportVerifier, TrustedKeys,
};
use serde_json::json;

// RFC 8032 section 7.1, test 1.
const RFC8032_SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const RFC8032_PUBLIC: &str = "0xd75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

#[test]
fn signing_key_derives_rfc8032_public_key() {
    let signing_key = parse_signing_key(RFC8032_SECRET).unwrap();
    let expected = parse_public_key(RFC8032_PUBLIC).unwrap();
    assert_eq!(signing_key.verifying_key(), expected);
    assert_eq!(key_fingerprint(&expected).len(), 16);
}

#[test]
fn signing_payload_is_canonical_and_excludes_signature() {
    let document = json!({
        "type": "astrobadge.report.v1",
        "repositoryOwner": "ullaakut",
        "repositoryName": "astronomer",
        "factors": {
            "overall": { "trustPercent": 0.85 },
            "accountAge": { "trustPercent": 1 }
        },
        "signerPubKey": "X",
        "signature": "Y"
    });

    let payload = signing_payload(&document).unwrap();
    assert_eq!(
        String::from_utf8(payload).unwrap(),
        concat!(
            r#"{"factors":{"accountAge":{"trustPercent":1},"overall":{"trustPercent":0.85}},"#,
            r#""repositoryName":"astronomer","repositoryOwner":"ullaakut","#,
            r#""signerPubKey":"X","type":"astrobadge.report.v1"}"#
        )
    );
}

#[test]
fn key_order_does_not_affect_verification() {
    let signing_key = parse_signing_key(RFC8032_SECRET).unwrap();
    let signed = sign_report(
        json!({
            "repositoryOwner": "o",
            "repositoryName": "n",
            "factors": { "overall": { "trustPercent": 0.5 } }
        }),
        &signing_key,
    )
    .unwrap();

    // Re-serialize with keys in a different textual order.
    let obj = signed.as_object().unwrap();
    let mut text = String::from("{");
    for (i, (key, value)) in obj.iter().rev().enumerate() {
        if i > 0 {
            text.push(',');
        }
        text.push_str(&serde_json::to_string(key).unwrap());
        text.push(':');
        text.push_str(&value.to_string());
    }
    text.push('}');

    let report = SignedReport::from_slice(text.as_bytes()).unwrap();
    let verifier = Ed25519ReportVerifier::new(TrustedKeys::parse(&[RFC8032_PUBLIC]).unwrap());
    assert_eq!(verifier.check(&report), Ok(()));
}
