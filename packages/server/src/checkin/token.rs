use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Encodes session ids into QR payloads and decodes them back.
///
/// Without a secret the payload is the bare session id. With a secret it is
/// `"<id>.<hex signature>"`, and payloads with a missing or wrong signature do
/// not decode. Decoding never establishes that a session is valid; the store
/// stays authoritative.
#[derive(Clone, Default)]
pub struct TokenSigner {
    key: Option<Vec<u8>>,
}

impl TokenSigner {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            key: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    pub fn is_signing(&self) -> bool {
        self.key.is_some()
    }

    pub fn encode(&self, session_id: &str) -> String {
        match self.mac(session_id) {
            Some(mac) => format!("{session_id}.{}", hex::encode(mac.finalize().into_bytes())),
            None => session_id.to_string(),
        }
    }

    /// Extract the session id from a scanned payload.
    pub fn decode<'p>(&self, payload: &'p str) -> Option<&'p str> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        if !self.is_signing() {
            return Some(payload);
        }

        let (id, sig) = payload.rsplit_once('.')?;
        let sig = hex::decode(sig).ok()?;
        let mac = self.mac(id)?;
        mac.verify_slice(&sig).ok()?;
        Some(id)
    }

    fn mac(&self, session_id: &str) -> Option<HmacSha256> {
        let key = self.key.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(key).ok()?;
        mac.update(session_id.as_bytes());
        Some(mac)
    }
}
