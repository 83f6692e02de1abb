//! Lightning addresses (`name@domain.tld`, LUD-16).

use crate::error::{Result, ValidationError};

/// Accept `local@domain` with exactly one `@`, both sides non-empty and a
/// `.` somewhere in the domain. Whitespace anywhere is rejected.
pub fn validate_lightning_address(address: &str) -> Result<()> {
    let valid = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !address.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress.into())
    }
}

/// The LUD-16 well-known URL an address resolves through.
pub fn well_known_url(address: &str) -> Result<String> {
    validate_lightning_address(address)?;
    let (local, domain) = address.split_once('@').ok_or(ValidationError::InvalidAddress)?;
    Ok(format!("https://{domain}/.well-known/lnurlp/{local}"))
}
