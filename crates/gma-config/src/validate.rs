//! Field parsers shared by the loader.

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Parse an absolute `http`/`https` base URL.
pub(crate) fn parse_base_url(field: &'static str, value: &str) -> ConfigResult<Url> {
    let trimmed = value.trim();
    let url = Url::parse(trimmed).map_err(|_| invalid(field, trimmed, "must be an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, trimmed, "scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid(field, trimmed, "must be usable as a base URL"));
    }
    Ok(url)
}

/// Parse a strictly positive integer.
pub(crate) fn parse_positive_u64(field: &'static str, value: &str) -> ConfigResult<u64> {
    let trimmed = value.trim().replace('_', "");
    let parsed = trimmed
        .parse::<u64>()
        .map_err(|_| invalid(field, value, "must be a non-negative integer"))?;
    if parsed == 0 {
        return Err(invalid(field, value, "must be greater than zero"));
    }
    Ok(parsed)
}

/// Parse a strictly positive count that fits in `usize`.
pub(crate) fn parse_positive_usize(field: &'static str, value: &str) -> ConfigResult<usize> {
    let parsed = parse_positive_u64(field, value)?;
    usize::try_from(parsed).map_err(|_| invalid(field, value, "exceeds platform limits"))
}

fn invalid(field: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value: Some(value.to_string()),
        reason,
    }
}
