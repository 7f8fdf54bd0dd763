//! Password hashing and session tokens.

use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

const AUTH_TOKEN_LENGTH: usize = 64;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(AUTH_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

#[derive(Clone, Debug)]
pub struct AuthToken {
    pub user_id: usize,
    pub value: AuthTokenValue,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

mod ditchfork_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    #[cfg(not(feature = "test-fast-hasher"))]
    fn argon2() -> Result<Argon2<'static>> {
        Ok(Argon2::default())
    }

    #[cfg(feature = "test-fast-hasher")]
    fn argon2() -> Result<Argon2<'static>> {
        use argon2::{Algorithm, Params, Version};
        let params =
            Params::new(Params::MIN_M_COST, 1, 1, None).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash(plain: &[u8], b64_salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2()?
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    pub fn verify(plain: &[u8], target_hash: &str) -> Result<bool> {
        let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2()?.verify_password(plain, &password_hash).is_ok())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordHasherKind {
    Argon2,
}

impl FromStr for PasswordHasherKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordHasherKind::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PasswordHasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordHasherKind::Argon2 => write!(f, "argon2"),
        }
    }
}

impl PasswordHasherKind {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            PasswordHasherKind::Argon2 => ditchfork_argon2::generate_b64_salt(),
        }
    }

    pub fn hash(&self, plain: &[u8], b64_salt: &str) -> Result<String> {
        match self {
            PasswordHasherKind::Argon2 => ditchfork_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify(&self, plain: &str, target_hash: &str) -> Result<bool> {
        match self {
            PasswordHasherKind::Argon2 => ditchfork_argon2::verify(plain.as_bytes(), target_hash),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PasswordCredentials {
    pub user_id: usize,
    pub salt: String,
    pub hash: String,
    pub hasher: PasswordHasherKind,
    pub created: SystemTime,
}

impl PasswordCredentials {
    pub fn create(user_id: usize, password: &str) -> Result<Self> {
        if password.is_empty() {
            bail!("Password cannot be empty");
        }
        let hasher = PasswordHasherKind::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
        })
    }

    pub fn verify(&self, password: &str) -> Result<bool> {
        self.hasher.verify(password, &self.hash)
    }
}
