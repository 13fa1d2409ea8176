//! Subcommand implementations.

pub mod check;
pub mod consult;

use anyhow::{Context, Result, bail};
use averba_core::gateway::{CredentialCache, HttpGateway, StaticCredentialSource};
use averba_core::session::Channel;
use averba_core::{Notice, NoticeKind};
use secrecy::SecretString;

/// Resolves the bearer token from the flag or the `AVERBA_TOKEN` variable.
pub fn resolve_token(flag: Option<String>) -> Result<SecretString> {
    let raw = match flag {
        Some(token) => token,
        None => std::env::var("AVERBA_TOKEN")
            .context("no token: pass --token or set AVERBA_TOKEN")?,
    };
    if raw.trim().is_empty() {
        bail!("token must not be empty");
    }
    Ok(SecretString::from(raw))
}

/// Builds the production gateway client for the given base URL and token.
pub fn build_gateway(
    base_url: &str,
    token: SecretString,
) -> Result<HttpGateway<StaticCredentialSource>> {
    let credentials = CredentialCache::new(StaticCredentialSource::new(token));
    HttpGateway::new(base_url, credentials).context("failed to build gateway client")
}

/// Maps the single-letter channel flag to the domain channel.
pub fn parse_channel(flag: &str) -> Result<Channel> {
    match flag {
        "s" => Ok(Channel::Sms),
        "w" => Ok(Channel::Whatsapp),
        other => bail!("unknown channel '{other}' (expected s or w)"),
    }
}

/// Prints a notice with the recovery action its category implies.
pub fn render_notice(notice: &Notice) {
    println!("! {}", notice.message);
    let hint = match notice.kind {
        NoticeKind::InvalidInput => "Correct the CPF or phone number and try again.",
        NoticeKind::BusinessRejection => "Review the data and try again, or contact support.",
        NoticeKind::ResendThrottled => "Wait a moment before requesting another code.",
        NoticeKind::SessionExpired => "Sign in again and retry.",
        NoticeKind::TransportFailure => "Check your connection and try again.",
        NoticeKind::LinkageDenied => "This account is already linked to another CPF.",
    };
    println!("  {hint}");
}
