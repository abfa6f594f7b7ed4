#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// The `xml:` prefix namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Digital Signature 1.1 namespace
pub const DSIG11: &str = "http://www.w3.org/2009/xmldsig11#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// XML Encryption 1.1 namespace
pub const ENC11: &str = "http://www.w3.org/2009/xmlenc11#";

/// SAML 2.0 assertion namespace
pub const SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace
pub const SAMLP: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// Exclusive XML Canonicalization namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// eIDAS SAML extensions namespace
pub const EIDAS: &str = "http://eidas.europa.eu/saml-extensions";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // DSig elements
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

    // KeyInfo elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";
    pub const EC_KEY_VALUE: &str = "ECKeyValue";
    pub const PUBLIC_KEY: &str = "PublicKey";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const DER_ENCODED_KEY_VALUE: &str = "DEREncodedKeyValue";

    // XML Encryption elements
    pub const ENCRYPTED_DATA: &str = "EncryptedData";
    pub const ENCRYPTED_KEY: &str = "EncryptedKey";
    pub const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub const CIPHER_DATA: &str = "CipherData";
    pub const CIPHER_VALUE: &str = "CipherValue";
    pub const OAEP_PARAMS: &str = "OAEPparams";
    pub const MGF: &str = "MGF";
    pub const AGREEMENT_METHOD: &str = "AgreementMethod";
    pub const KEY_DERIVATION_METHOD: &str = "KeyDerivationMethod";
    pub const CONCAT_KDF_PARAMS: &str = "ConcatKDFParams";
    pub const ORIGINATOR_KEY_INFO: &str = "OriginatorKeyInfo";
    pub const RECIPIENT_KEY_INFO: &str = "RecipientKeyInfo";

    // SAML protocol elements
    pub const AUTHN_REQUEST: &str = "AuthnRequest";
    pub const RESPONSE: &str = "Response";
    pub const STATUS: &str = "Status";
    pub const STATUS_CODE: &str = "StatusCode";
    pub const STATUS_MESSAGE: &str = "StatusMessage";
    pub const EXTENSIONS: &str = "Extensions";
    pub const NAME_ID_POLICY: &str = "NameIDPolicy";
    pub const REQUESTED_AUTHN_CONTEXT: &str = "RequestedAuthnContext";

    // SAML assertion elements
    pub const ISSUER: &str = "Issuer";
    pub const ASSERTION: &str = "Assertion";
    pub const ENCRYPTED_ASSERTION: &str = "EncryptedAssertion";
    pub const SUBJECT: &str = "Subject";
    pub const NAME_ID: &str = "NameID";
    pub const AUTHN_STATEMENT: &str = "AuthnStatement";
    pub const AUTHN_CONTEXT: &str = "AuthnContext";
    pub const AUTHN_CONTEXT_CLASS_REF: &str = "AuthnContextClassRef";
    pub const ATTRIBUTE_STATEMENT: &str = "AttributeStatement";
    pub const ATTRIBUTE: &str = "Attribute";
    pub const ATTRIBUTE_VALUE: &str = "AttributeValue";

    // eIDAS extension elements
    pub const REQUESTED_ATTRIBUTES: &str = "RequestedAttributes";
    pub const REQUESTED_ATTRIBUTE: &str = "RequestedAttribute";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "ID";
    pub const URI: &str = "URI";
    pub const ALGORITHM: &str = "Algorithm";
    pub const VALUE: &str = "Value";
    pub const VERSION: &str = "Version";
    pub const ISSUE_INSTANT: &str = "IssueInstant";
    pub const DESTINATION: &str = "Destination";
    pub const CONSENT: &str = "Consent";
    pub const IN_RESPONSE_TO: &str = "InResponseTo";
    pub const FORCE_AUTHN: &str = "ForceAuthn";
    pub const IS_PASSIVE: &str = "IsPassive";
    pub const PROTOCOL_BINDING: &str = "ProtocolBinding";
    pub const PROVIDER_NAME: &str = "ProviderName";
    pub const ASSERTION_CONSUMER_SERVICE_URL: &str = "AssertionConsumerServiceURL";
    pub const FORMAT: &str = "Format";
    pub const COMPARISON: &str = "Comparison";
    pub const NAME: &str = "Name";
    pub const FRIENDLY_NAME: &str = "FriendlyName";
    pub const NAME_FORMAT: &str = "NameFormat";
    pub const IS_REQUIRED: &str = "isRequired";
    pub const ALGORITHM_ID: &str = "AlgorithmID";
    pub const PARTY_U_INFO: &str = "PartyUInfo";
    pub const PARTY_V_INFO: &str = "PartyVInfo";
    pub const PREFIX_LIST: &str = "PrefixList";
}
