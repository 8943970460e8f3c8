use std::env;
use std::str::FromStr;

use dotenv::dotenv;

use crate::auth::TokenSecrets;

error_chain! {
    errors {
        MissingVar(name: &'static str) {
            description("missing environment variable")
            display("environment variable {} must be set", name)
        }
        InvalidVar(name: &'static str, value: String) {
            description("invalid environment variable")
            display("environment variable {} has an invalid value: {:?}", name, value)
        }
        SharedSecret {
            description("access and refresh secrets are equal")
            display("ACCESS_SECRET and REFRESH_SECRET must differ")
        }
    }
}

const DEFAULT_POOL_SIZE: u32 = 10;

/// Process configuration, read once at start-up and handed to Rocket as
/// managed state.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub bcrypt_cost: u32,
    pub secrets: TokenSecrets,
}

impl Config {
    pub fn new(database_url: impl Into<String>, secrets: TokenSecrets) -> Self {
        Config {
            database_url: database_url.into(),
            pool_size: DEFAULT_POOL_SIZE,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            secrets,
        }
    }

    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        let access = required("ACCESS_SECRET")?;
        let refresh = required("REFRESH_SECRET")?;
        if access == refresh {
            bail!(ErrorKind::SharedSecret);
        }
        Ok(Config {
            database_url: required("DATABASE_URL")?,
            pool_size: optional("DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            bcrypt_cost: optional("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            secrets: TokenSecrets::new(access, refresh),
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!(ErrorKind::MissingVar(name)),
    }
}

fn optional<T: FromStr>(name: &'static str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ErrorKind::InvalidVar(name, value.clone()).into()),
        Err(_) => Ok(default),
    }
}
