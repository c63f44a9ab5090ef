use rand::RngCore;
use rand::rngs::OsRng;

/// Signs the JWTs the gateway accepts.
pub const JWT_SECRET: &str = "HASURA_JWT_SECRET";
/// Authorizes gateway action calls back into the primary app.
pub const ACTIONS_SECRET: &str = "RUBY_ACTIONS_API_SECRET";
/// Session signing key of the primary app.
pub const SECRET_KEY_BASE: &str = "SECRET_KEY_BASE";
/// Set by the database add-on.
pub const DATABASE_URL: &str = "DATABASE_URL";

const SECRET_BYTES: usize = 64;

/// Hex encoding of `len` bytes from the OS random source.
#[must_use]
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Secrets generated once, when a primary app is created.
#[derive(Clone)]
pub struct SecretTriad {
    pub jwt_secret: String,
    pub actions_secret: String,
    pub secret_key_base: String,
}

impl SecretTriad {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            jwt_secret: random_hex(SECRET_BYTES),
            actions_secret: random_hex(SECRET_BYTES),
            secret_key_base: random_hex(SECRET_BYTES),
        }
    }

    /// The triad as configuration variables.
    #[must_use]
    pub fn env_vars(&self) -> [(&'static str, &str); 3] {
        [
            (JWT_SECRET, &self.jwt_secret),
            (ACTIONS_SECRET, &self.actions_secret),
            (SECRET_KEY_BASE, &self.secret_key_base),
        ]
    }
}

impl std::fmt::Debug for SecretTriad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretTriad(***)")
    }
}
