//! RSA encryption of deployment secrets
//!
//! Secrets are encrypted with the installer's public key (PKCS#1 v1.5) and
//! sent base64 encoded. A field that cannot be encrypted keeps its
//! plaintext; the submission itself never fails here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::WizardError;
use crate::models::deployment::DeploymentConfig;
use crate::secure::fields::SECRET_FIELDS;

/// Parse a PEM (SPKI or PKCS#1) or bare base64 DER public key
pub fn parse_public_key(text: &str) -> Result<RsaPublicKey, WizardError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WizardError::EncryptError("empty public key".to_string()));
    }

    if text.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(text)
            .map_err(|e| WizardError::EncryptError(e.to_string()));
    }
    if text.starts_with("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(text)
            .map_err(|e| WizardError::EncryptError(e.to_string()));
    }

    let compact: String = text.split_whitespace().collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| WizardError::EncryptError(format!("public key is not base64: {}", e)))?;

    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| WizardError::EncryptError(e.to_string()))
}

/// Encrypt one value, base64 encoded
pub fn encrypt_value(key: &RsaPublicKey, plaintext: &str) -> Result<String, WizardError> {
    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| WizardError::EncryptError(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Encrypts the secret fields of deployment configs
pub struct SecureSubmitter {
    key: Result<RsaPublicKey, String>,
}

impl SecureSubmitter {
    /// Create a submitter; an unusable key is kept as an error and every
    /// field is then left in plaintext
    pub fn new(public_key: &str) -> Self {
        let key = parse_public_key(public_key).map_err(|e| {
            warn!("Unusable public key, secrets will be sent as is: {}", e);
            e.to_string()
        });
        Self { key }
    }

    pub fn has_key(&self) -> bool {
        self.key.is_ok()
    }

    fn encrypt_slot(&self, slot: &mut Value) {
        let Some(plaintext) = slot.as_str().filter(|s| !s.is_empty()) else {
            return;
        };

        let encrypted = match &self.key {
            Ok(key) => encrypt_value(key, plaintext),
            Err(e) => Err(WizardError::EncryptError(e.clone())),
        };

        match encrypted {
            Ok(ciphertext) => *slot = Value::String(ciphertext),
            Err(e) => debug!("Keeping plaintext for a secret field: {}", e),
        }
    }

    /// Encrypted copy of `config`; the input is left untouched
    pub fn encrypt(&self, config: &DeploymentConfig) -> DeploymentConfig {
        let mut output = config.clone();
        for field in SECRET_FIELDS {
            for slot in field.locate(&mut output.0) {
                self.encrypt_slot(slot);
            }
        }
        output
    }
}

/// Encrypt the secret fields of `config` with `public_key`
pub fn encrypt_config(config: &DeploymentConfig, public_key: &str) -> DeploymentConfig {
    SecureSubmitter::new(public_key).encrypt(config)
}
