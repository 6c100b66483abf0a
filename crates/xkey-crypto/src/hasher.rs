use xkey_types::KeyDigest;

/// BLAKE3 hasher for secondary keys.
///
/// The default hasher hashes the raw key bytes. A hasher with a domain tag
/// prepends `"<domain>:"` to every input, which keeps digests from separate
/// deployments sharing one index apart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyHasher {
    domain: Option<String>,
}

impl KeyHasher {
    /// Hasher over the raw key bytes.
    pub const fn new() -> Self {
        Self { domain: None }
    }

    /// Create a hasher with a domain tag.
    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
        }
    }

    /// Digest one key.
    pub fn digest(&self, key: &[u8]) -> KeyDigest {
        let mut hasher = blake3::Hasher::new();
        if let Some(domain) = &self.domain {
            hasher.update(domain.as_bytes());
            hasher.update(b":");
        }
        hasher.update(key);
        KeyDigest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Digest a string key.
    pub fn digest_str(&self, key: &str) -> KeyDigest {
        self.digest(key.as_bytes())
    }

    /// The domain tag, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}
