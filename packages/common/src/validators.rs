use thiserror::Error;

/// Throwaway mailbox providers that may not be used for staff accounts.
pub const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "tempmail.com",
    "throwaway.email",
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "trashmail.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("Phone number must contain 10-15 digits")]
    PhoneLength,
    #[error("Phone number must start with 08 or 62")]
    PhonePrefix,
    #[error("Invalid email format")]
    EmailFormat,
    #[error("Email addresses from disposable domains are not allowed")]
    DisposableEmail,
}

/// Validate a phone number. Non-digit characters are ignored; an empty value is accepted.
pub fn validate_phone_number(value: &str) -> Result<(), ContactError> {
    if value.is_empty() {
        return Ok(());
    }
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if !(10..=15).contains(&digits.len()) {
        return Err(ContactError::PhoneLength);
    }
    if !(digits.starts_with("08") || digits.starts_with("62")) {
        return Err(ContactError::PhonePrefix);
    }
    Ok(())
}

/// Validate an e-mail address and reject disposable mailbox domains.
pub fn validate_email(value: &str) -> Result<(), ContactError> {
    let (local, domain) = value.split_once('@').ok_or(ContactError::EmailFormat)?;

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let (host, tld) = domain.rsplit_once('.').ok_or(ContactError::EmailFormat)?;
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    if !(local_ok && host_ok && tld_ok) {
        return Err(ContactError::EmailFormat);
    }

    let domain = domain.to_lowercase();
    if DISPOSABLE_EMAIL_DOMAINS.contains(&domain.as_str()) {
        return Err(ContactError::DisposableEmail);
    }
    Ok(())
}
