//! External collaborators.
//!
//! Account storage, ban lookup, IP geolocation, the MOTD text and the
//! operator notice sink. Each store sits behind a trait so the reactor only
//! sees narrow, synchronous interfaces.

pub mod accounts;
pub mod bans;
pub mod geo;
pub mod notify;

pub use accounts::{Account, AccountError, AccountStore, MemoryAccountStore, valid_username};
pub use bans::{Ban, BanStore, MemoryBanStore};
pub use geo::{CidrGeoLookup, GeoLookup};
pub use notify::OperatorNotice;

use crate::config::Config;

/// Everything the handlers consult outside the lobby state itself.
pub struct Services {
    pub accounts: Box<dyn AccountStore>,
    pub bans: Box<dyn BanStore>,
    pub geo: Box<dyn GeoLookup>,
    pub motd: Vec<String>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self, AccountError> {
        Ok(Self {
            accounts: Box::new(MemoryAccountStore::from_config(&config.accounts)?),
            bans: Box::new(MemoryBanStore::new(config.bans.clone())),
            geo: Box::new(CidrGeoLookup::new(&config.geo)),
            motd: config.motd.load_lines(),
        })
    }
}
