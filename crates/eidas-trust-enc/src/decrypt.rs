#![forbid(unsafe_code)]

//! Assertion decryption.
//!
//! 1. Check every algorithm against the context whitelists.
//! 2. Classify the first `EncryptedKey` as key transport or key wrap and
//!    recover the public key it was encrypted for.
//! 3. Select the credential holding that key.
//! 4. Decrypt every `EncryptedAssertion` with that credential.
//! 5. Splice the plaintext into a copy of the response root element and
//!    parse the result from scratch so that `ID` lookups see the decrypted
//!    assertions.

use crate::context::DecryptionContext;
use eidas_trust_core::{algorithm, ns, DecryptionError, Error};
use eidas_trust_crypto::{
    cipher, kdf, keyagreement, keytransport, keywrap, ConcatKdfParams, OaepParams,
};
use eidas_trust_keys::{keyinfo, x509, Credential, PrivateKey, PublicKey};
use eidas_trust_saml::Response;
use eidas_trust_xml::{find_child, find_children};
use roxmltree::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyClass {
    Transport,
    Wrap,
}

/// Decrypt all encrypted assertions of `response`.
///
/// Returns a new response parsed from the patched document. Any failure
/// rejects the whole response; there is no partial result.
pub fn decrypt(
    response: &Response,
    ctx: &DecryptionContext,
) -> Result<Response, DecryptionError> {
    decrypt_response(response, ctx).map_err(|e| {
        tracing::warn!(
            id = response.id.as_deref().unwrap_or(""),
            error = %e,
            "cannot decrypt response"
        );
        e
    })
}

fn decrypt_response(
    response: &Response,
    ctx: &DecryptionContext,
) -> Result<Response, DecryptionError> {
    if !response.is_encrypted() {
        return Err(DecryptionError::NotEncrypted);
    }

    let xml = response.xml();
    let doc = eidas_trust_xml::parse(xml).map_err(malformed)?;
    let root = doc.root_element();
    let encrypted = find_children(root, ns::SAML, ns::node::ENCRYPTED_ASSERTION);
    let first = *encrypted.first().ok_or(DecryptionError::NotEncrypted)?;

    for node in &encrypted {
        check_algorithms(*node, ctx)?;
    }

    let first_key = encrypted_key(first)?;
    let (class, _) = classify(first_key)?;
    let recovered = recover_public_key(first_key, class)?;
    let credential = select_credential(ctx, &recovered)?;

    let plaintexts = encrypted
        .iter()
        .map(|node| decrypt_assertion(*node, credential))
        .collect::<Result<Vec<_>, _>>()?;
    for plaintext in &plaintexts {
        check_plaintext(root, plaintext)?;
    }

    let patched = splice(xml, root, &encrypted, &plaintexts);
    let reparsed = eidas_trust_saml::parse_response(&patched).map_err(DecryptionError::Reparse)?;

    if reparsed.is_encrypted()
        || reparsed.assertions.len() != response.assertions.len() + encrypted.len()
    {
        return Err(DecryptionError::Malformed(
            "decrypted content is not an assertion".into(),
        ));
    }

    tracing::debug!(
        id = reparsed.id.as_deref().unwrap_or(""),
        assertions = encrypted.len(),
        "decrypted response"
    );
    Ok(reparsed)
}

fn malformed(e: Error) -> DecryptionError {
    DecryptionError::Malformed(e.to_string())
}

fn encryption_method<'a, 'input>(node: Node<'a, 'input>) -> Option<(Node<'a, 'input>, &'a str)> {
    let method = find_child(node, ns::ENC, ns::node::ENCRYPTION_METHOD)?;
    let uri = method.attribute(ns::attr::ALGORITHM)?;
    Some((method, uri.trim()))
}

fn encrypted_data<'a, 'input>(
    assertion: Node<'a, 'input>,
) -> Result<Node<'a, 'input>, DecryptionError> {
    find_child(assertion, ns::ENC, ns::node::ENCRYPTED_DATA)
        .ok_or_else(|| DecryptionError::Malformed("EncryptedAssertion has no EncryptedData".into()))
}

/// The `EncryptedKey` of an assertion: inside `EncryptedData/KeyInfo`, or a
/// sibling of `EncryptedData`.
fn encrypted_key<'a, 'input>(
    assertion: Node<'a, 'input>,
) -> Result<Node<'a, 'input>, DecryptionError> {
    let data = encrypted_data(assertion)?;
    find_child(data, ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| find_child(ki, ns::ENC, ns::node::ENCRYPTED_KEY))
        .or_else(|| find_child(assertion, ns::ENC, ns::node::ENCRYPTED_KEY))
        .ok_or(DecryptionError::MissingEncryptedKey)
}

fn classify<'a>(key: Node<'a, '_>) -> Result<(KeyClass, &'a str), DecryptionError> {
    let (_, uri) = encryption_method(key).ok_or(DecryptionError::MissingAlgorithm)?;
    let class = if keytransport::is_key_transport(uri) {
        KeyClass::Transport
    } else if keywrap::is_key_wrap(uri) {
        KeyClass::Wrap
    } else {
        return Err(DecryptionError::UnknownAlgorithmClass);
    };
    tracing::debug!(algorithm = uri, class = ?class, "classified EncryptedKey");
    Ok((class, uri))
}

fn check_algorithms(
    assertion: Node<'_, '_>,
    ctx: &DecryptionContext,
) -> Result<(), DecryptionError> {
    let (_, data_uri) =
        encryption_method(encrypted_data(assertion)?).ok_or(DecryptionError::MissingAlgorithm)?;
    if !ctx.allows_data_algorithm(data_uri) {
        return Err(DecryptionError::AlgorithmNotAllowed(data_uri.to_owned()));
    }

    let (class, key_uri) = classify(encrypted_key(assertion)?)?;
    let allowed = match class {
        KeyClass::Transport => ctx.allows_key_transport(key_uri),
        KeyClass::Wrap => ctx.allows_key_wrap(key_uri),
    };
    if !allowed {
        return Err(DecryptionError::AlgorithmNotAllowed(key_uri.to_owned()));
    }
    Ok(())
}

fn agreement_method<'a, 'input>(key: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    find_child(key, ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| find_child(ki, ns::ENC, ns::node::AGREEMENT_METHOD))
}

/// The public key the content key was encrypted for.
fn recover_public_key(key: Node<'_, '_>, class: KeyClass) -> Result<PublicKey, DecryptionError> {
    let key_info = match class {
        KeyClass::Transport => find_child(key, ns::DSIG, ns::node::KEY_INFO),
        KeyClass::Wrap => {
            let agreement = agreement_method(key).ok_or(DecryptionError::MissingAgreementMethod)?;
            find_child(agreement, ns::ENC, ns::node::RECIPIENT_KEY_INFO)
        }
    };

    let material = match key_info {
        Some(ki) => keyinfo::extract_key_material(ki).map_err(malformed)?,
        None => None,
    }
    .ok_or(DecryptionError::MissingKeyMaterial)?;

    material.public_key().map_err(malformed)
}

fn select_credential<'c>(
    ctx: &'c DecryptionContext,
    key: &PublicKey,
) -> Result<&'c Credential, DecryptionError> {
    let at = if ctx.check_validity_period {
        Some(x509::resolve_verification_time(ctx.verification_time).map_err(malformed)?)
    } else {
        None
    };

    let usable: Vec<&Credential> = ctx
        .credentials
        .iter()
        .filter(|c| c.private_key().is_some())
        .filter(|c| {
            at.as_ref()
                .map_or(true, |t| x509::check_validity(c.certificate(), t).is_ok())
        })
        .collect();
    if usable.is_empty() {
        return Err(DecryptionError::NoValidCredential);
    }

    let selected = usable
        .into_iter()
        .find(|c| c.public_key() == key)
        .ok_or(DecryptionError::NoMatchingCredential)?;
    tracing::debug!(subject = %selected.subject(), "selected decryption credential");
    Ok(selected)
}

fn cipher_value(node: Node<'_, '_>) -> Result<Vec<u8>, DecryptionError> {
    let value = find_child(node, ns::ENC, ns::node::CIPHER_DATA)
        .and_then(|cd| find_child(cd, ns::ENC, ns::node::CIPHER_VALUE))
        .ok_or_else(|| DecryptionError::Malformed("missing CipherData/CipherValue".into()))?;
    keyinfo::decode_crypto_binary(value.text().unwrap_or("")).map_err(malformed)
}

fn decrypt_assertion(
    assertion: Node<'_, '_>,
    credential: &Credential,
) -> Result<String, DecryptionError> {
    let data = encrypted_data(assertion)?;
    let (_, data_uri) = encryption_method(data).ok_or(DecryptionError::MissingAlgorithm)?;
    let key = encrypted_key(assertion)?;
    let (class, key_uri) = classify(key)?;
    let wrapped = cipher_value(key)?;
    let private = credential
        .private_key()
        .ok_or(DecryptionError::NoValidCredential)?;

    let content_key = match class {
        KeyClass::Transport => {
            let PrivateKey::Rsa(rsa_key) = private else {
                return Err(DecryptionError::Malformed(
                    "key transport requires an RSA credential".into(),
                ));
            };
            let params = match encryption_method(key) {
                Some((method, _)) => read_oaep_params(method)?,
                None => OaepParams::default(),
            };
            keytransport::from_uri_with_params(key_uri, params)
                .and_then(|t| t.decrypt(rsa_key, &wrapped))
                .map_err(DecryptionError::Cipher)?
        }
        KeyClass::Wrap => unwrap_with_agreement(key, key_uri, private, &wrapped)?,
    };

    let ciphertext = cipher_value(data)?;
    let plaintext = cipher::from_uri(data_uri)
        .and_then(|c| c.decrypt(&content_key, &ciphertext))
        .map_err(DecryptionError::Cipher)?;
    let text = String::from_utf8(plaintext)
        .map_err(|e| DecryptionError::Malformed(format!("plaintext is not UTF-8: {e}")))?;
    Ok(strip_xml_declaration(&text).to_owned())
}

/// ECDH-ES with the originator's ephemeral key, ConcatKDF, then AES key unwrap.
fn unwrap_with_agreement(
    key: Node<'_, '_>,
    key_uri: &str,
    private: &PrivateKey,
    wrapped: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let agreement = agreement_method(key).ok_or(DecryptionError::MissingAgreementMethod)?;
    let agreement_uri = agreement.attribute(ns::attr::ALGORITHM).unwrap_or("");
    if agreement_uri != algorithm::ECDH_ES {
        return Err(DecryptionError::Cipher(Error::UnsupportedAlgorithm(format!(
            "key agreement: {agreement_uri}"
        ))));
    }

    let originator = find_child(agreement, ns::ENC, ns::node::ORIGINATOR_KEY_INFO)
        .ok_or_else(|| DecryptionError::Malformed("missing OriginatorKeyInfo".into()))?;
    let originator_key = keyinfo::extract_ec_public_key(originator)
        .map_err(malformed)?
        .ok_or(DecryptionError::MissingKeyMaterial)?;
    let point = originator_key
        .to_sec1_bytes()
        .ok_or_else(|| DecryptionError::Malformed("originator key is not an EC key".into()))?;

    let shared = match private {
        PrivateKey::EcP256(sk) => keyagreement::ecdh_p256(&point, sk),
        PrivateKey::EcP384(sk) => keyagreement::ecdh_p384(&point, sk),
        PrivateKey::EcP521(sk) => keyagreement::ecdh_p521(&point, sk),
        PrivateKey::Rsa(_) => Err(Error::Key("key agreement requires an EC credential".into())),
    }
    .map_err(DecryptionError::Cipher)?;

    let kdm = find_child(agreement, ns::ENC11, ns::node::KEY_DERIVATION_METHOD)
        .ok_or_else(|| DecryptionError::Malformed("missing KeyDerivationMethod".into()))?;
    let kdf_uri = kdm.attribute(ns::attr::ALGORITHM).unwrap_or("");
    if kdf_uri != algorithm::CONCAT_KDF {
        return Err(DecryptionError::Cipher(Error::UnsupportedAlgorithm(format!(
            "key derivation: {kdf_uri}"
        ))));
    }
    let params = read_concat_kdf_params(kdm).map_err(malformed)?;

    let kw = keywrap::from_uri(key_uri).map_err(DecryptionError::Cipher)?;
    let kek = kdf::concat_kdf(&shared, kw.kek_size(), &params).map_err(DecryptionError::Cipher)?;
    kw.unwrap(&kek, wrapped).map_err(DecryptionError::Cipher)
}

fn read_oaep_params(method: Node<'_, '_>) -> Result<OaepParams, DecryptionError> {
    let mut params = OaepParams::default();
    for child in method.children().filter(|n| n.is_element()) {
        let local = child.tag_name().name();
        let child_ns = child.tag_name().namespace().unwrap_or("");
        if local == ns::node::DIGEST_METHOD && child_ns == ns::DSIG {
            params.digest_uri = child.attribute(ns::attr::ALGORITHM).map(str::to_owned);
        } else if local == ns::node::MGF && child_ns == ns::ENC11 {
            params.mgf_uri = child.attribute(ns::attr::ALGORITHM).map(str::to_owned);
        } else if local == ns::node::OAEP_PARAMS && child_ns == ns::ENC {
            let label = keyinfo::decode_crypto_binary(child.text().unwrap_or(""))
                .map_err(malformed)?;
            params.label = Some(label);
        }
    }
    Ok(params)
}

fn read_concat_kdf_params(kdm: Node<'_, '_>) -> Result<ConcatKdfParams, Error> {
    let Some(cp) = find_child(kdm, ns::ENC11, ns::node::CONCAT_KDF_PARAMS) else {
        return Ok(ConcatKdfParams::default());
    };
    concat_kdf_params(
        find_child(cp, ns::DSIG, ns::node::DIGEST_METHOD)
            .and_then(|dm| dm.attribute(ns::attr::ALGORITHM)),
        cp.attribute(ns::attr::ALGORITHM_ID),
        cp.attribute(ns::attr::PARTY_U_INFO),
        cp.attribute(ns::attr::PARTY_V_INFO),
    )
}

/// Build ConcatKDF parameters from the hex attribute values.
///
/// Each value starts with a padding-bits byte which is dropped.
pub(crate) fn concat_kdf_params(
    digest_uri: Option<&str>,
    algorithm_id: Option<&str>,
    party_u_info: Option<&str>,
    party_v_info: Option<&str>,
) -> Result<ConcatKdfParams, Error> {
    let decode = |value: Option<&str>| -> Result<Option<Vec<u8>>, Error> {
        value
            .map(|v| {
                let bytes = hex::decode(v.trim())
                    .map_err(|e| Error::XmlStructure(format!("invalid ConcatKDF hex value: {e}")))?;
                Ok(bytes.get(1..).map(<[u8]>::to_vec).unwrap_or_default())
            })
            .transpose()
    };
    Ok(ConcatKdfParams {
        digest_uri: digest_uri.map(str::to_owned),
        algorithm_id: decode(algorithm_id)?,
        party_u_info: decode(party_u_info)?,
        party_v_info: decode(party_v_info)?,
    })
}

/// Drop a leading `<?xml ...?>` declaration.
fn strip_xml_declaration(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    text
}

/// Require a decrypted payload to be exactly one `<saml:Assertion>`.
///
/// The payload is parsed inside a wrapper carrying the namespace
/// declarations in scope on `root`, since the assertion may use prefixes
/// declared there.
fn check_plaintext(root: Node<'_, '_>, plaintext: &str) -> Result<(), DecryptionError> {
    let mut wrapped = String::from("<plaintext");
    for namespace in root.namespaces() {
        let uri = namespace
            .uri()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('"', "&quot;");
        match namespace.name() {
            Some("xml") => continue,
            Some(prefix) => wrapped.push_str(&format!(r#" xmlns:{prefix}="{uri}""#)),
            None => wrapped.push_str(&format!(r#" xmlns="{uri}""#)),
        }
    }
    wrapped.push('>');
    wrapped.push_str(plaintext);
    wrapped.push_str("</plaintext>");

    let doc = eidas_trust_xml::parse(&wrapped).map_err(malformed)?;
    let wrapper = doc.root_element();
    let stray_text = wrapper
        .children()
        .any(|n| n.is_text() && n.text().is_some_and(|t| !t.trim().is_empty()));
    let elements: Vec<_> = wrapper.children().filter(Node::is_element).collect();
    match elements.as_slice() {
        [only] if !stray_text && only.has_tag_name((ns::SAML, ns::node::ASSERTION)) => Ok(()),
        _ => Err(DecryptionError::Malformed(
            "decrypted content is not a single assertion".into(),
        )),
    }
}

/// Copy the root element of `xml`, replacing each of `nodes` (children of
/// the root, in document order) with the matching replacement text.
pub(crate) fn splice(
    xml: &str,
    root: Node<'_, '_>,
    nodes: &[Node<'_, '_>],
    replacements: &[String],
) -> String {
    let outer = root.range();
    let added: usize = replacements.iter().map(String::len).sum();
    let mut out = String::with_capacity(outer.len() + added);
    let mut pos = outer.start;
    for (node, replacement) in nodes.iter().zip(replacements) {
        let range = node.range();
        out.push_str(&xml[pos..range.start]);
        out.push_str(replacement);
        pos = range.end;
    }
    out.push_str(&xml[pos..outer.end]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_declaration_only_at_start() {
        assert_eq!(
            strip_xml_declaration("<?xml version=\"1.0\"?>\n<a/>"),
            "<a/>"
        );
        assert_eq!(strip_xml_declaration("<a/>"), "<a/>");
        assert_eq!(strip_xml_declaration("<a><?xml x?></a>"), "<a><?xml x?></a>");
    }

    #[test]
    fn splice_drops_prolog_and_replaces_in_order() {
        let xml = "<?xml version=\"1.0\"?><r><x>1</x><k/><x>2</x></r>";
        let doc = eidas_trust_xml::parse(xml).unwrap();
        let root = doc.root_element();
        let nodes: Vec<_> = root.children().filter(|n| n.has_tag_name("x")).collect();
        let out = splice(xml, root, &nodes, &["<a/>".to_string(), "<b/>".to_string()]);
        assert_eq!(out, "<r><a/><k/><b/></r>");
    }

    #[test]
    fn plaintext_must_be_one_assertion() {
        let xml = r#"<p:Response xmlns:p="urn:oasis:names:tc:SAML:2.0:protocol"
            xmlns:a="urn:oasis:names:tc:SAML:2.0:assertion" ID="r"/>"#;
        let doc = eidas_trust_xml::parse(xml).unwrap();
        let root = doc.root_element();

        assert!(check_plaintext(root, r#"<a:Assertion ID="_a1"><a:Issuer>x</a:Issuer></a:Assertion>"#).is_ok());
        for bad in [
            r#"<a:Assertion ID="_a1"/><a:Assertion ID="_a2"/>"#,
            r#"<a:Issuer>x</a:Issuer>"#,
            r#"<a:Assertion ID="_a1"/>trailing"#,
            "",
            "<a:Assertion",
        ] {
            assert!(
                matches!(check_plaintext(root, bad), Err(DecryptionError::Malformed(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn kdf_params_drop_padding_byte() {
        let params = concat_kdf_params(None, Some("00AABB"), Some("00"), None).unwrap();
        assert_eq!(params.algorithm_id, Some(vec![0xAA, 0xBB]));
        assert_eq!(params.party_u_info, Some(vec![]));
        assert_eq!(params.party_v_info, None);
        assert!(concat_kdf_params(None, Some("zz"), None, None).is_err());
    }

    #[test]
    fn unencrypted_response_is_rejected() {
        let response = eidas_trust_saml::parse_response(
            r#"<p:Response xmlns:p="urn:oasis:names:tc:SAML:2.0:protocol" ID="r"/>"#,
        )
        .unwrap();
        let err = decrypt(&response, &DecryptionContext::default()).unwrap_err();
        assert!(matches!(err, DecryptionError::NotEncrypted));
        assert_eq!(err.to_string(), "Response is not encrypted");
    }
}
