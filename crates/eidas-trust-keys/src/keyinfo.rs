#![forbid(unsafe_code)]

//! `<ds:KeyInfo>` processing: which key material a message carries.

use crate::credential::PublicKey;
use eidas_trust_core::{ns, Error};
use eidas_trust_xml::{find_child, find_children};

/// Key material found in a message's `KeyInfo`, by representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// `X509Data/X509Certificate`: DER certificate bytes.
    Certificate(Vec<u8>),
    /// `DEREncodedKeyValue`: DER `SubjectPublicKeyInfo`.
    DerPublicKey(Vec<u8>),
    /// `KeyValue/RSAKeyValue`: big-endian modulus and exponent.
    RsaComponents { modulus: Vec<u8>, exponent: Vec<u8> },
}

impl KeyMaterial {
    /// Decode the public key this material describes.
    pub fn public_key(&self) -> Result<PublicKey, Error> {
        match self {
            Self::Certificate(der) => {
                use der::Decode;
                let cert = x509_cert::Certificate::from_der(der)
                    .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;
                PublicKey::from_certificate(&cert)
            }
            Self::DerPublicKey(spki) => PublicKey::from_spki_der(spki),
            Self::RsaComponents { modulus, exponent } => {
                PublicKey::from_rsa_components(modulus, exponent)
            }
        }
    }
}

/// Decode a base64 `CryptoBinary` / `base64Binary` value, ignoring whitespace.
pub fn decode_crypto_binary(text: &str) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(Error::Base64("empty value".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(clean.as_bytes())
        .map_err(|e| Error::Base64(e.to_string()))
}

fn node_binary(node: roxmltree::Node<'_, '_>, what: &str) -> Result<Vec<u8>, Error> {
    decode_crypto_binary(node.text().unwrap_or(""))
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

/// Extract key material from a `<ds:KeyInfo>` element.
///
/// Preference: the first `X509Certificate` of the first `X509Data`, then
/// `DEREncodedKeyValue`, then `KeyValue/RSAKeyValue`.
pub fn extract_key_material(
    key_info: roxmltree::Node<'_, '_>,
) -> Result<Option<KeyMaterial>, Error> {
    for x509_data in find_children(key_info, ns::DSIG, ns::node::X509_DATA) {
        if let Some(cert) = find_child(x509_data, ns::DSIG, ns::node::X509_CERTIFICATE) {
            return node_binary(cert, "X509Certificate")
                .map(|der| Some(KeyMaterial::Certificate(der)));
        }
    }

    if let Some(der_key) = find_child(key_info, ns::DSIG11, ns::node::DER_ENCODED_KEY_VALUE) {
        return node_binary(der_key, "DEREncodedKeyValue")
            .map(|der| Some(KeyMaterial::DerPublicKey(der)));
    }

    if let Some(rsa_kv) = find_child(key_info, ns::DSIG, ns::node::KEY_VALUE)
        .and_then(|kv| find_child(kv, ns::DSIG, ns::node::RSA_KEY_VALUE))
    {
        let modulus = find_child(rsa_kv, ns::DSIG, ns::node::RSA_MODULUS)
            .ok_or_else(|| Error::MissingElement("Modulus".into()))?;
        let exponent = find_child(rsa_kv, ns::DSIG, ns::node::RSA_EXPONENT)
            .ok_or_else(|| Error::MissingElement("Exponent".into()))?;
        return Ok(Some(KeyMaterial::RsaComponents {
            modulus: node_binary(modulus, "Modulus")?,
            exponent: node_binary(exponent, "Exponent")?,
        }));
    }

    Ok(None)
}

/// Extract an EC public key from a key-agreement `OriginatorKeyInfo`.
///
/// Accepts `KeyValue/ECKeyValue` (named curve plus SEC1 point) or a
/// `DEREncodedKeyValue`.
pub fn extract_ec_public_key(
    key_info: roxmltree::Node<'_, '_>,
) -> Result<Option<PublicKey>, Error> {
    let ec_kv = find_child(key_info, ns::DSIG, ns::node::KEY_VALUE).and_then(|kv| {
        find_child(kv, ns::DSIG11, ns::node::EC_KEY_VALUE)
            .or_else(|| find_child(kv, ns::DSIG, ns::node::EC_KEY_VALUE))
    });

    if let Some(ec_kv) = ec_kv {
        let curve_uri = ec_kv
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "NamedCurve")
            .and_then(|n| n.attribute(ns::attr::URI))
            .ok_or_else(|| Error::MissingAttribute("URI on NamedCurve".into()))?;
        let point = ec_kv
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == ns::node::PUBLIC_KEY)
            .ok_or_else(|| Error::MissingElement("PublicKey".into()))?;
        let point = node_binary(point, "EC PublicKey")?;
        return ec_point_for_curve(curve_uri, &point).map(Some);
    }

    if let Some(der_key) = find_child(key_info, ns::DSIG11, ns::node::DER_ENCODED_KEY_VALUE) {
        let key = PublicKey::from_spki_der(&node_binary(der_key, "DEREncodedKeyValue")?)?;
        if key.is_rsa() {
            return Err(Error::Key("originator key is not an EC key".into()));
        }
        return Ok(Some(key));
    }

    Ok(None)
}

fn ec_point_for_curve(curve_uri: &str, point: &[u8]) -> Result<PublicKey, Error> {
    let invalid = |e: p256::elliptic_curve::Error| Error::Key(format!("invalid EC point: {e}"));
    match curve_uri.trim_start_matches("urn:oid:") {
        "1.2.840.10045.3.1.7" => p256::PublicKey::from_sec1_bytes(point)
            .map(PublicKey::EcP256)
            .map_err(invalid),
        "1.3.132.0.34" => p384::PublicKey::from_sec1_bytes(point)
            .map(PublicKey::EcP384)
            .map_err(invalid),
        "1.3.132.0.35" => p521::PublicKey::from_sec1_bytes(point)
            .map(PublicKey::EcP521)
            .map_err(invalid),
        other => Err(Error::UnsupportedAlgorithm(format!("EC curve: {other}"))),
    }
}
