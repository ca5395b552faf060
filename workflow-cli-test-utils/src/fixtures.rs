//! Randomly suffixed account identities used for one suite run

use rand::Rng;

pub const DEFAULT_PASSWORD: &str = "asdf1234";
pub const EMAIL_DOMAIN: &str = "deis.io";

/// Username, password and email of one controller account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let email = format!("{username}@{EMAIL_DOMAIN}");
        Self {
            username,
            password: password.into(),
            email,
        }
    }
}

/// The admin and regular accounts registered at setup and cancelled at teardown.
///
/// Both share one random suffix so a run's accounts are easy to spot on the
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixtures {
    pub admin: Identity,
    pub user: Identity,
    suffix: u32,
}

impl Fixtures {
    pub fn generate() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_suffix(rng.gen_range(0..1000))
    }

    pub fn with_suffix(suffix: u32) -> Self {
        Self {
            admin: Identity::new(format!("test-admin-{suffix}"), DEFAULT_PASSWORD),
            user: Identity::new(format!("test-{suffix}"), DEFAULT_PASSWORD),
            suffix,
        }
    }

    pub fn suffix(&self) -> u32 {
        self.suffix
    }
}

/// `test-<n>` app name for scenarios that create apps
pub fn random_app_name() -> String {
    format!("test-{}", rand::thread_rng().gen_range(0..1000))
}
