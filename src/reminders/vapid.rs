use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config::AppConfig;
use crate::types::push::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

impl VapidCredentials {
    /// Environment assignments for the generated pair, ready to paste.
    pub fn env_lines(&self, subject: &str) -> Vec<String> {
        vec![
            format!("PILLMINDER_VAPID_PRIVATE_KEY=\"{}\"", self.private_key),
            format!("PILLMINDER_VAPID_PUBLIC_KEY=\"{}\"", self.public_key),
            format!("PILLMINDER_VAPID_SUBJECT=\"{subject}\""),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

impl VapidConfigStatus {
    /// Blank values count as absent.
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let private_key = present(&config.vapid_private_key);
        let public_key = present(&config.vapid_public_key);
        let subject = present(&config.vapid_subject);

        match (private_key, public_key, subject) {
            (Some(private_key), Some(public_key), Some(subject)) => {
                VapidConfigStatus::Ready(VapidConfig {
                    private_key,
                    public_key,
                    subject,
                })
            }
            (None, None, None) => VapidConfigStatus::Missing,
            _ => VapidConfigStatus::Incomplete,
        }
    }

    pub(crate) fn ready(self) -> Option<VapidConfig> {
        match self {
            VapidConfigStatus::Ready(vapid) => Some(vapid),
            VapidConfigStatus::Missing | VapidConfigStatus::Incomplete => None,
        }
    }
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    let key_pair = random_key_pair(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();

    Ok(VapidCredentials {
        private_key,
        public_key: encode_config(public_key, URL_SAFE_NO_PAD),
    })
}

/// Not every 32-byte string is a valid P-256 scalar; draw until one is.
fn random_key_pair<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}
