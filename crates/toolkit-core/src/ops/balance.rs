use std::fmt;

use log::debug;
use sol_tx::{format_sol, Address};

use crate::error::ToolkitError;
use crate::session::Session;

const DISPLAY_PLACES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub owner: Address,
    pub lamports: u64,
}

impl Balance {
    /// SOL with four decimal places, rounded to nearest.
    pub fn sol(&self) -> String {
        format_sol(self.lamports, DISPLAY_PLACES)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.sol())
    }
}

pub async fn fetch_balance(session: &Session) -> Result<Balance, ToolkitError> {
    let owner = session.owner()?;
    let lamports = session.gateway().get_balance(&owner).await?;
    debug!("Balance of {owner}: {lamports} lamports");
    Ok(Balance { owner, lamports })
}
