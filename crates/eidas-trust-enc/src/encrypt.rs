#![forbid(unsafe_code)]

//! Assertion encryption for a recipient node.
//!
//! RSA recipients get RSA-OAEP key transport; EC recipients get ECDH-ES
//! with ConcatKDF and AES-256 key wrap. The recipient's certificate is
//! carried so the receiver can select its credential.

use crate::decrypt::{concat_kdf_params, splice};
use eidas_trust_core::{algorithm, ns, Error};
use eidas_trust_crypto::{cipher, kdf, keyagreement, keytransport, keywrap, OaepParams};
use eidas_trust_keys::{Credential, PublicKey};
use eidas_trust_xml::find_children;
use rand::RngCore;

const CURVE_P256: &str = "urn:oid:1.2.840.10045.3.1.7";
const CURVE_P384: &str = "urn:oid:1.3.132.0.34";
const CURVE_P521: &str = "urn:oid:1.3.132.0.35";

/// Replace every `saml:Assertion` child of a serialized response with an
/// `EncryptedAssertion` for `recipient`, using `data_algorithm` for content.
pub fn encrypt_assertions(
    response_xml: &str,
    recipient: &Credential,
    data_algorithm: &str,
) -> Result<String, Error> {
    let doc = eidas_trust_xml::parse(response_xml)?;
    let root = doc.root_element();
    let assertions = find_children(root, ns::SAML, ns::node::ASSERTION);
    if assertions.is_empty() {
        return Err(Error::MissingElement("Assertion".into()));
    }

    let encrypted = assertions
        .iter()
        .map(|a| encrypted_assertion(&response_xml[a.range()], recipient, data_algorithm))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        recipient = %recipient.subject(),
        assertions = assertions.len(),
        "encrypted assertions"
    );
    Ok(splice(response_xml, root, &assertions, &encrypted))
}

fn b64(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn encrypted_assertion(
    plaintext: &str,
    recipient: &Credential,
    data_algorithm: &str,
) -> Result<String, Error> {
    let content_cipher = cipher::from_uri(data_algorithm)?;
    let mut content_key = vec![0u8; content_cipher.key_size()];
    rand::thread_rng().fill_bytes(&mut content_key);
    let ciphertext = content_cipher.encrypt(&content_key, plaintext.as_bytes())?;

    let encrypted_key = match recipient.public_key() {
        PublicKey::Rsa(public) => transport_key(public, recipient, &content_key)?,
        ec => agreement_key(ec, recipient, &content_key)?,
    };

    Ok(format!(
        concat!(
            r#"<saml2:EncryptedAssertion xmlns:saml2="{saml}">"#,
            r#"<xenc:EncryptedData xmlns:xenc="{enc}" xmlns:ds="{dsig}" Type="http://www.w3.org/2001/04/xmlenc#Element">"#,
            r#"<xenc:EncryptionMethod Algorithm="{data_alg}"/>"#,
            r#"<ds:KeyInfo>{encrypted_key}</ds:KeyInfo>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData>"#,
            r#"</xenc:EncryptedData>"#,
            r#"</saml2:EncryptedAssertion>"#,
        ),
        saml = ns::SAML,
        enc = ns::ENC,
        dsig = ns::DSIG,
        data_alg = data_algorithm,
        encrypted_key = encrypted_key,
        value = b64(&ciphertext),
    ))
}

fn recipient_x509_data(recipient: &Credential) -> String {
    format!(
        "<ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data>",
        b64(recipient.der())
    )
}

fn transport_key(
    public: &rsa::RsaPublicKey,
    recipient: &Credential,
    content_key: &[u8],
) -> Result<String, Error> {
    let params = OaepParams {
        digest_uri: Some(algorithm::SHA256.to_owned()),
        ..OaepParams::default()
    };
    let wrapped = keytransport::from_uri_with_params(algorithm::RSA_OAEP, params)?
        .encrypt(public, content_key)?;

    Ok(format!(
        concat!(
            r#"<xenc:EncryptedKey>"#,
            r#"<xenc:EncryptionMethod Algorithm="{alg}"><ds:DigestMethod Algorithm="{digest}"/></xenc:EncryptionMethod>"#,
            r#"<ds:KeyInfo>{x509}</ds:KeyInfo>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData>"#,
            r#"</xenc:EncryptedKey>"#,
        ),
        alg = algorithm::RSA_OAEP,
        digest = algorithm::SHA256,
        x509 = recipient_x509_data(recipient),
        value = b64(&wrapped),
    ))
}

fn agreement_key(
    public: &PublicKey,
    recipient: &Credential,
    content_key: &[u8],
) -> Result<String, Error> {
    let (ephemeral, shared, curve) = match public {
        PublicKey::EcP256(pk) => {
            let (e, s) = keyagreement::originate_p256(pk);
            (e, s, CURVE_P256)
        }
        PublicKey::EcP384(pk) => {
            let (e, s) = keyagreement::originate_p384(pk);
            (e, s, CURVE_P384)
        }
        PublicKey::EcP521(pk) => {
            let (e, s) = keyagreement::originate_p521(pk);
            (e, s, CURVE_P521)
        }
        PublicKey::Rsa(_) => {
            return Err(Error::Key("key agreement requires an EC recipient".into()))
        }
    };

    let algorithm_id = format!("00{}", hex::encode(algorithm::KW_AES256));
    let party_info = "00";
    let params = concat_kdf_params(
        Some(algorithm::SHA256),
        Some(&algorithm_id),
        Some(party_info),
        Some(party_info),
    )?;
    let kw = keywrap::from_uri(algorithm::KW_AES256)?;
    let kek = kdf::concat_kdf(&shared, kw.kek_size(), &params)?;
    let wrapped = kw.wrap(&kek, content_key)?;

    Ok(format!(
        concat!(
            r#"<xenc:EncryptedKey>"#,
            r#"<xenc:EncryptionMethod Algorithm="{kw}"/>"#,
            r#"<ds:KeyInfo><xenc:AgreementMethod Algorithm="{ecdh}">"#,
            r#"<xenc11:KeyDerivationMethod xmlns:xenc11="{enc11}" Algorithm="{kdf}">"#,
            r#"<xenc11:ConcatKDFParams AlgorithmID="{alg_id}" PartyUInfo="{party}" PartyVInfo="{party}">"#,
            r#"<ds:DigestMethod Algorithm="{digest}"/>"#,
            r#"</xenc11:ConcatKDFParams></xenc11:KeyDerivationMethod>"#,
            r#"<xenc:OriginatorKeyInfo><ds:KeyValue>"#,
            r#"<dsig11:ECKeyValue xmlns:dsig11="{dsig11}"><dsig11:NamedCurve URI="{curve}"/>"#,
            r#"<dsig11:PublicKey>{ephemeral}</dsig11:PublicKey></dsig11:ECKeyValue>"#,
            r#"</ds:KeyValue></xenc:OriginatorKeyInfo>"#,
            r#"<xenc:RecipientKeyInfo>{x509}</xenc:RecipientKeyInfo>"#,
            r#"</xenc:AgreementMethod></ds:KeyInfo>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData>"#,
            r#"</xenc:EncryptedKey>"#,
        ),
        kw = algorithm::KW_AES256,
        ecdh = algorithm::ECDH_ES,
        enc11 = ns::ENC11,
        kdf = algorithm::CONCAT_KDF,
        alg_id = algorithm_id,
        party = party_info,
        digest = algorithm::SHA256,
        dsig11 = ns::DSIG11,
        curve = curve,
        ephemeral = b64(&ephemeral),
        x509 = recipient_x509_data(recipient),
        value = b64(&wrapped),
    ))
}
