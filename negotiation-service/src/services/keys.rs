use std::path::Path;

use anyhow::Context;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;

/// Read-only signing material shared by the mandate signer and verifier.
pub trait KeyProvider: Send + Sync {
    fn key_id(&self) -> &str;

    fn algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    fn encoding_key(&self) -> &EncodingKey;

    fn decoding_key(&self) -> &DecodingKey;

    /// SPKI PEM of the verification key, for publication to suppliers.
    fn public_key_pem(&self) -> &str;
}

pub struct RsaKeyProvider {
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_pem: String,
}

impl RsaKeyProvider {
    /// Generates a fresh key pair that lives as long as the process.
    pub fn generate(key_id: impl Into<String>, bits: usize) -> anyhow::Result<Self> {
        let key_id = key_id.into();
        let started = std::time::Instant::now();
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .context("Failed to generate RSA key")?;
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .context("Failed to encode RSA private key")?;
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .context("Failed to encode RSA public key")?;
        tracing::info!(
            key_id = %key_id,
            bits,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated ephemeral mandate signing key"
        );
        Self::from_pem(key_id, private_pem.as_bytes(), public_pem)
    }

    pub fn from_pem(
        key_id: impl Into<String>,
        private_pem: &[u8],
        public_pem: String,
    ) -> anyhow::Result<Self> {
        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem).context("Invalid RSA private key PEM")?;
        let decoding_key =
            DecodingKey::from_rsa_pem(public_pem.as_bytes()).context("Invalid RSA public key PEM")?;
        Ok(Self {
            key_id: key_id.into(),
            encoding_key,
            decoding_key,
            public_key_pem: public_pem,
        })
    }

    pub fn from_pem_files(
        key_id: impl Into<String>,
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let private_path = private_path.as_ref();
        let public_path = public_path.as_ref();
        let private_pem = std::fs::read(private_path)
            .with_context(|| format!("Failed to read {}", private_path.display()))?;
        let public_pem = std::fs::read_to_string(public_path)
            .with_context(|| format!("Failed to read {}", public_path.display()))?;
        let provider = Self::from_pem(key_id, &private_pem, public_pem)?;
        tracing::info!(key_id = %provider.key_id, "Loaded mandate signing key from PEM files");
        Ok(provider)
    }
}

impl KeyProvider for RsaKeyProvider {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

/// One key pair per test binary; RSA generation is too slow to repeat.
#[cfg(test)]
pub(crate) fn test_key_provider() -> std::sync::Arc<RsaKeyProvider> {
    use once_cell::sync::Lazy;
    use std::sync::Arc;

    static KEYS: Lazy<Arc<RsaKeyProvider>> = Lazy::new(|| {
        Arc::new(RsaKeyProvider::generate("test-key", 2048).expect("generate test key"))
    });
    KEYS.clone()
}
