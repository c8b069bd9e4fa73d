//! Signing secret checks run once at startup.
//!
//! HS256 secrets must be at least 32 bytes with reasonable entropy, and the external and
//! internal secrets must never be the same value.

const MIN_SECRET_LENGTH: usize = 32; // 256 bits minimum
const RECOMMENDED_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStrength {
    /// Reject at startup
    Weak,
    Acceptable,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("{name} is too weak: at least {MIN_SECRET_LENGTH} bytes of non-trivial data required")]
    Weak { name: &'static str },

    #[error("external and internal signing secrets must differ")]
    Shared,
}

/// Classify a secret by length, Shannon entropy and obvious patterns.
pub fn validate_secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < MIN_ENTROPY_BITS || has_obvious_patterns(bytes) {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Fails with `SecretError::Weak` naming the offending setting.
pub fn require_usable_secret(name: &'static str, secret: &str) -> Result<(), SecretError> {
    match validate_secret_strength(secret) {
        SecretStrength::Weak => Err(SecretError::Weak { name }),
        SecretStrength::Acceptable => {
            tracing::warn!(setting = name, "Signing secret is shorter than recommended");
            Ok(())
        }
        SecretStrength::Strong => Ok(()),
    }
}

/// The two trust domains collapse into one if they share a secret.
pub fn ensure_distinct_secrets(external: &str, internal: &str) -> Result<(), SecretError> {
    if external == internal {
        return Err(SecretError::Shared);
    }
    Ok(())
}

/// Bits per byte (0-8)
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Runs of 4+ identical bytes ("aaaa") or ascending bytes ("1234").
fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut same = 1;
    let mut ascending = 1;

    for window in data.windows(2) {
        same = if window[0] == window[1] { same + 1 } else { 1 };
        ascending = if window[1] as i16 - window[0] as i16 == 1 {
            ascending + 1
        } else {
            1
        };

        if same >= 4 || ascending >= 4 {
            return true;
        }
    }

    false
}
