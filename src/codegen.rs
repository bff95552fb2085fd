use crate::{
    error::{LinkError, LinkResult},
    store::LinkStore,
};
use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default code length. 62^6 codes leaves plenty of headroom at the scale
/// this service runs at.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Upper bound on draws before giving up on a saturated code space.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Draws random alphanumeric short codes that are not currently in use.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
    max_attempts: u32,
}

impl CodeGenerator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length: length.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate a code that doesn't exist in `store` at the time of the
    /// check. The caller still inserts with `LinkStore::insert_new`, which is
    /// the real guard against a concurrent writer taking the same code.
    pub fn generate(&self, store: &LinkStore) -> LinkResult<String> {
        for _ in 0..self.max_attempts {
            let code = random_code(self.length);
            if !store.exists(&code) {
                return Ok(code);
            }
            tracing::debug!("Short code '{}' already taken, drawing again", code);
        }
        Err(LinkError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Generate a random alphanumeric string of the given length.
fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
