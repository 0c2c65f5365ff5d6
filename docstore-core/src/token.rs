//! Share-link token generation. Tokens must be unguessable and
//! collision-resistant by construction; there is no retry-on-collision
//! logic anywhere downstream.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

const TOKEN_BYTES: usize = 32;

pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> Result<String>;
}

/// OS-entropy token generator: 256 random bits, url-safe base64.
pub struct SystemTokenGenerator {
    rng: SystemRandom,
}

impl SystemTokenGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator for SystemTokenGenerator {
    fn generate(&self) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| anyhow!("system rng unavailable"))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
