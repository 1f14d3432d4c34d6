//! Blind-claim cryptography for bounties.
//!
//! Each bounty gets its own RSA keypair. Claimants encrypt a `{password, address}` guess to
//! the bounty's public key, so competing claimants cannot read each other's passwords off the
//! broadcast channel. Only the oracle holding the private key can check a guess against the
//! committed `password_hash`.

use crate::domain::records::RsaKeyPairRecord;
use crate::foundation::{KeyHash, OracleError, Pwtxid, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Public key as published in `bounty_created`: modulus and exponent as decimal strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKeyData {
    pub n: String,
    pub e: String,
}

impl RsaPublicKeyData {
    pub fn from_key(key: &RsaPublicKey) -> Self {
        Self { n: key.n().to_string(), e: key.e().to_string() }
    }

    pub fn to_key(&self) -> Result<RsaPublicKey> {
        let n: BigUint = self.n.parse().map_err(|err| OracleError::crypto("rsa public key modulus", err))?;
        let e: BigUint = self.e.parse().map_err(|err| OracleError::crypto("rsa public key exponent", err))?;
        Ok(RsaPublicKey::new(n, e)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// sha256 hex of the compact JSON form; claimants use it as the `passwords` map key.
    pub fn key_hash(&self) -> Result<KeyHash> {
        Ok(KeyHash::new(sha256_hex(self.to_json()?.as_bytes())))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    pub password: String,
    pub address: String,
}

impl Guess {
    pub fn matches(&self, password_hash: &str) -> bool {
        sha256_hex(self.password.as_bytes()).eq_ignore_ascii_case(password_hash.trim())
    }
}

pub struct BlindKeyPair {
    private_key: RsaPrivateKey,
    public: RsaPublicKeyData,
}

impl BlindKeyPair {
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)?;
        let public = RsaPublicKeyData::from_key(&RsaPublicKey::from(&private_key));
        Ok(Self { private_key, public })
    }

    pub fn from_record(record: &RsaKeyPairRecord) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(&record.private_key_pem)
            .map_err(|err| OracleError::crypto("rsa private key decode", err))?;
        let public = RsaPublicKeyData::from_key(&RsaPublicKey::from(&private_key));
        Ok(Self { private_key, public })
    }

    pub fn public(&self) -> &RsaPublicKeyData {
        &self.public
    }

    pub fn to_record(&self, pwtxid: &Pwtxid, created_at: u64) -> Result<RsaKeyPairRecord> {
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| OracleError::crypto("rsa private key encode", err))?;
        Ok(RsaKeyPairRecord {
            pwtxid: pwtxid.clone(),
            private_key_pem: pem.to_string(),
            public_key_json: self.public.to_json()?,
            key_hash: self.public.key_hash()?,
            created_at,
        })
    }

    /// Decrypts a base64 ciphertext into a guess. Whitespace inside the base64 is tolerated.
    pub fn decrypt_guess(&self, ciphertext_b64: &str) -> Result<Guess> {
        let compact: String = ciphertext_b64.chars().filter(|c| !c.is_whitespace()).collect();
        let ciphertext = STANDARD.decode(compact)?;
        let plaintext = self.private_key.decrypt(Pkcs1v15Encrypt, &ciphertext)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Claimant side of the protocol: encrypts a guess to a bounty's published key.
pub fn encrypt_guess(public: &RsaPublicKeyData, guess: &Guess) -> Result<String> {
    let key = public.to_key()?;
    let plaintext = serde_json::to_vec(guess)?;
    let ciphertext = key.encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, &plaintext)?;
    Ok(STANDARD.encode(ciphertext))
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
