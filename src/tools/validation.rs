use anyhow::{anyhow, Result};
use std::net::Ipv4Addr;
use std::path::Path;

const HOSTNAME_MAX_LEN: usize = 253;
const PASSWORD_MIN_LEN: usize = 8;

pub fn validate_ipv4_address(ip: &str) -> Result<Ipv4Addr> {
    ip.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| anyhow!("Invalid IPv4 address: {}", ip))
}

pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(anyhow!("Port cannot be 0"));
    }
    Ok(())
}

/// Port typed by the operator
pub fn parse_port(port: &str) -> Result<u16> {
    let port = port
        .trim()
        .parse::<u16>()
        .map_err(|_| anyhow!("Invalid port: {}", port))?;
    validate_port(port)?;
    Ok(port)
}

/// Hostnames are word characters with inner hyphens, no spaces or symbols
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(anyhow!("Hostname cannot be empty"));
    }
    if hostname.len() > HOSTNAME_MAX_LEN {
        return Err(anyhow!("Hostname maximum length is {}", HOSTNAME_MAX_LEN));
    }

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let first_last_ok = hostname.starts_with(is_word) && hostname.ends_with(is_word);
    let body_ok = hostname.chars().all(|c| is_word(c) || c == '-');
    if !first_last_ok || !body_ok {
        return Err(anyhow!("Hostname cannot contain special characters"));
    }
    Ok(())
}

/// New device passwords need a capital letter, a number and some length
pub fn validate_new_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(anyhow!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(anyhow!("Password must contain a capital letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Password must contain a number"));
    }
    Ok(())
}

pub fn validate_admin_pin(pin: &str) -> Result<()> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Pin code must be made of 4 digits"));
    }
    Ok(())
}

pub fn validate_country_code(code: &str) -> Result<()> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(anyhow!("Country code must be 2 letters, e.g. CH, US, DE"));
    }
    Ok(())
}

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }
    if !path.is_dir() {
        return Err(anyhow!("Path is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Adapter turning a validation function into a prompt validator
pub fn for_prompt<T>(check: impl Fn(&str) -> Result<T>) -> impl Fn(&str) -> Result<(), String> {
    move |answer| check(answer).map(|_| ()).map_err(|e| e.to_string())
}
