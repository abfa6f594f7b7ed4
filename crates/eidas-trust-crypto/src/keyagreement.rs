#![forbid(unsafe_code)]

//! ECDH-ES (Ephemeral-Static) key agreement over the NIST curves.
//!
//! The originator's ephemeral public key travels in the message as SEC1
//! bytes; the recipient combines it with its static private key. The raw
//! shared secret is then fed into ConcatKDF to produce the KEK.

use eidas_trust_core::Error;

macro_rules! ecdh_curve {
    ($recipient:ident, $originate:ident, $curve:ident, $name:literal) => {
        #[doc = concat!("Recipient side of ECDH-ES over ", $name, ".")]
        ///
        /// `originator_public` holds the originator's ephemeral key as SEC1 bytes.
        pub fn $recipient(
            originator_public: &[u8],
            recipient_private: &$curve::SecretKey,
        ) -> Result<Vec<u8>, Error> {
            let public_key = $curve::PublicKey::from_sec1_bytes(originator_public)
                .map_err(|e| Error::Key(format!(concat!("invalid ", $name, " public key: {}"), e)))?;
            let shared = $curve::ecdh::diffie_hellman(
                recipient_private.to_nonzero_scalar(),
                public_key.as_affine(),
            );
            Ok(shared.raw_secret_bytes().to_vec())
        }

        #[doc = concat!("Originator side of ECDH-ES over ", $name, ".")]
        ///
        /// Returns the ephemeral public key (uncompressed SEC1) and the shared secret.
        pub fn $originate(recipient_public: &$curve::PublicKey) -> (Vec<u8>, Vec<u8>) {
            use $curve::elliptic_curve::sec1::ToEncodedPoint;
            let ephemeral = $curve::ecdh::EphemeralSecret::random(&mut rand::rngs::OsRng);
            let public = ephemeral
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec();
            let shared = ephemeral.diffie_hellman(recipient_public);
            (public, shared.raw_secret_bytes().to_vec())
        }
    };
}

ecdh_curve!(ecdh_p256, originate_p256, p256, "P-256");
ecdh_curve!(ecdh_p384, originate_p384, p384, "P-384");
ecdh_curve!(ecdh_p521, originate_p521, p521, "P-521");
