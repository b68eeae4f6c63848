//! Addresses and identifiers found on the network: emails, URLs, hosts, IPs, MACs, UUIDs

use super::{options_rule, pattern, string_arg, Arity, FnRule, RuleRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};
use uuid::{Uuid, Variant};

/// Options for `isEmail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailOptions {
    /// Accept `Display Name <user@example.com>`
    pub allow_display_name: bool,
    /// Allow non-ASCII characters in the local part
    pub allow_utf8_local_part: bool,
    /// Require top-level domain (e.g., .com, .org)
    pub require_tld: bool,
    /// Accept an IP address in place of the domain
    pub allow_ip_domain: bool,
    /// Skip the RFC 5321 length limits
    pub ignore_max_length: bool,
}

impl Default for EmailOptions {
    fn default() -> Self {
        Self {
            allow_display_name: false,
            allow_utf8_local_part: true,
            require_tld: true,
            allow_ip_domain: false,
            ignore_max_length: false,
        }
    }
}

impl EmailOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_display_name(mut self, allow: bool) -> Self {
        self.allow_display_name = allow;
        self
    }

    pub fn require_tld(mut self, require: bool) -> Self {
        self.require_tld = require;
        self
    }

    pub fn allow_ip_domain(mut self, allow: bool) -> Self {
        self.allow_ip_domain = allow;
        self
    }
}

/// Options for `isFQDN`, also applied to the host part of emails and URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FqdnOptions {
    pub require_tld: bool,
    pub allow_underscores: bool,
    pub allow_trailing_dot: bool,
    pub allow_numeric_tld: bool,
    /// Accept a leading `*.` label
    pub allow_wildcard: bool,
}

impl Default for FqdnOptions {
    fn default() -> Self {
        Self {
            require_tld: true,
            allow_underscores: false,
            allow_trailing_dot: false,
            allow_numeric_tld: false,
            allow_wildcard: false,
        }
    }
}

/// Options for `isURL`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlOptions {
    /// Accepted schemes
    pub protocols: Vec<String>,
    pub require_protocol: bool,
    pub require_tld: bool,
    pub require_host: bool,
    pub allow_underscores: bool,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            protocols: vec!["http".into(), "https".into(), "ftp".into()],
            require_protocol: false,
            require_tld: true,
            require_host: true,
            allow_underscores: false,
        }
    }
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_protocol(mut self, require: bool) -> Self {
        self.require_protocol = require;
        self
    }

    pub fn require_tld(mut self, require: bool) -> Self {
        self.require_tld = require;
        self
    }
}

/// Options for `isMACAddress`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacAddressOptions {
    /// Expect twelve bare hex digits with no separators
    pub no_colons: bool,
}

const URL_MAX_LENGTH: usize = 2083;

static EMAIL_LOCAL_ASCII: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^[a-z0-9!#$%&'*+\-/=?^_`{|}~]+(?:\.[a-z0-9!#$%&'*+\-/=?^_`{|}~]+)*$")
});
static EMAIL_LOCAL_UTF8: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^[a-z0-9!#$%&'*+\-/=?^_`{|}~\x{00A1}-\x{FFFF}]+(?:\.[a-z0-9!#$%&'*+\-/=?^_`{|}~\x{00A1}-\x{FFFF}]+)*$")
});
static DISPLAY_NAME: Lazy<Regex> = Lazy::new(|| pattern(r"^([^<>]*?)\s*<(.+)>$"));
static TLD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:[a-z\x{00A1}-\x{00A8}\x{00AA}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}]{2,}|xn[a-z0-9-]{2,})$")
});
static LABEL: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^[a-z_\x{00A1}-\x{FFFF}0-9-]+$"));
static UUID_SHAPE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
});

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(options_rule("isEmail", is_email))
        .register(options_rule("isURL", is_url))
        .register(options_rule("isFQDN", is_fqdn))
        .register(FnRule::prepared("isIP", Arity::optional(1), |args: &[Value]| {
            let version = ip_version(args)?;
            Ok(move |input: &str| is_ip(input, version))
        }))
        .register(FnRule::prepared("isIPRange", Arity::optional(1), |args: &[Value]| {
            let version = ip_version(args)?;
            Ok(move |input: &str| is_ip_range(input, version))
        }))
        .register(options_rule("isMACAddress", is_mac_address))
        .register(FnRule::prepared("isUUID", Arity::optional(1), |args: &[Value]| {
            let version = uuid_version(args)?;
            Ok(move |input: &str| is_uuid(input, version))
        }));
}

pub fn is_email(input: &str, opts: &EmailOptions) -> bool {
    let address = if opts.allow_display_name {
        match DISPLAY_NAME.captures(input) {
            Some(captures) => match captures.get(2) {
                Some(address) => address.as_str(),
                None => return false,
            },
            None => input,
        }
    } else {
        input
    };

    // Split at the last `@`; quoted local parts are not supported
    let Some((local_part, domain_part)) = address.rsplit_once('@') else {
        return false;
    };
    if local_part.is_empty() || domain_part.is_empty() || local_part.contains('@') {
        return false;
    }

    // RFC 5321 limits
    if !opts.ignore_max_length && (local_part.len() > 64 || domain_part.len() > 254) {
        return false;
    }

    let local_ok = if opts.allow_utf8_local_part {
        EMAIL_LOCAL_UTF8.is_match(local_part)
    } else {
        EMAIL_LOCAL_ASCII.is_match(local_part)
    };
    if !local_ok {
        return false;
    }

    let fqdn = FqdnOptions {
        require_tld: opts.require_tld,
        ..FqdnOptions::default()
    };
    if is_fqdn(domain_part, &fqdn) {
        return true;
    }

    if opts.allow_ip_domain {
        let bare = domain_part
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(domain_part);
        let bare = bare.strip_prefix("IPv6:").unwrap_or(bare);
        return bare.parse::<IpAddr>().is_ok();
    }
    false
}

pub fn is_fqdn(input: &str, opts: &FqdnOptions) -> bool {
    let mut host = input;
    if opts.allow_trailing_dot {
        host = host.strip_suffix('.').unwrap_or(host);
    }
    if opts.allow_wildcard {
        host = host.strip_prefix("*.").unwrap_or(host);
    }
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if opts.require_tld {
        if labels.len() < 2 {
            return false;
        }
        let tld = labels[labels.len() - 1];
        let numeric = tld.bytes().all(|b| b.is_ascii_digit());
        if !(TLD.is_match(tld) || (opts.allow_numeric_tld && numeric)) {
            return false;
        }
    }

    labels.iter().all(|label| {
        label.len() <= 63
            && LABEL.is_match(label)
            && !label.chars().any(|c| ('\u{FF01}'..='\u{FF5E}').contains(&c))
            && !label.starts_with('-')
            && !label.ends_with('-')
            && (opts.allow_underscores || !label.contains('_'))
    })
}

pub fn is_url(input: &str, opts: &UrlOptions) -> bool {
    if input.is_empty()
        || input.len() > URL_MAX_LENGTH
        || input.chars().any(char::is_whitespace)
        || input.starts_with("mailto:")
    {
        return false;
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else if opts.require_protocol {
        return false;
    } else {
        format!("http://{}", input.trim_start_matches("//"))
    };

    let Ok(url) = Url::parse(&candidate) else {
        return false;
    };
    if !opts.protocols.iter().any(|p| p.eq_ignore_ascii_case(url.scheme())) {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            let fqdn = FqdnOptions {
                require_tld: opts.require_tld,
                allow_underscores: opts.allow_underscores,
                ..FqdnOptions::default()
            };
            (domain == "localhost" && !opts.require_tld) || is_fqdn(domain, &fqdn)
        }
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
        None => !opts.require_host,
    }
}

fn ip_version(args: &[Value]) -> Result<Option<u8>, String> {
    match string_arg(args, 0).as_deref() {
        None => Ok(None),
        Some("4") => Ok(Some(4)),
        Some("6") => Ok(Some(6)),
        Some(other) => Err(format!("unsupported IP version `{}`", other)),
    }
}

fn parse_ipv6(input: &str) -> Option<Ipv6Addr> {
    // zone identifiers such as `fe80::1%eth0` are accepted
    let address = match input.split_once('%') {
        Some((address, zone)) if !zone.is_empty() => address,
        Some(_) => return None,
        None => input,
    };
    address.parse().ok()
}

/// Any address, or only version 4 or 6
pub fn is_ip(input: &str, version: Option<u8>) -> bool {
    match version {
        None => input.parse::<Ipv4Addr>().is_ok() || parse_ipv6(input).is_some(),
        Some(4) => input.parse::<Ipv4Addr>().is_ok(),
        Some(_) => parse_ipv6(input).is_some(),
    }
}

/// CIDR notation, e.g. `10.0.0.0/8`
pub fn is_ip_range(input: &str, version: Option<u8>) -> bool {
    let Some((address, prefix)) = input.split_once('/') else {
        return false;
    };
    if prefix.is_empty()
        || !prefix.bytes().all(|b| b.is_ascii_digit())
        || (prefix.len() > 1 && prefix.starts_with('0'))
    {
        return false;
    }
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };

    let v4 = address.parse::<Ipv4Addr>().is_ok() && prefix <= 32;
    let v6 = address.parse::<Ipv6Addr>().is_ok() && prefix <= 128;
    match version {
        None => v4 || v6,
        Some(4) => v4,
        Some(_) => v6,
    }
}

fn hex_groups(input: &str, separator: char, count: usize, width: usize) -> bool {
    let groups: Vec<&str> = input.split(separator).collect();
    groups.len() == count
        && groups
            .iter()
            .all(|group| group.len() == width && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

pub fn is_mac_address(input: &str, opts: &MacAddressOptions) -> bool {
    if opts.no_colons {
        return input.len() == 12 && input.bytes().all(|b| b.is_ascii_hexdigit());
    }
    [':', '-', ' '].iter().any(|&separator| hex_groups(input, separator, 6, 2))
        || hex_groups(input, '.', 3, 4)
}

fn uuid_version(args: &[Value]) -> Result<Option<usize>, String> {
    match string_arg(args, 0).as_deref() {
        None | Some("all") => Ok(None),
        Some(version) => match version.parse::<usize>() {
            Ok(number @ 1..=8) => Ok(Some(number)),
            _ => Err(format!("unsupported UUID version `{}`", version)),
        },
    }
}

/// Any UUID when `version` is `None`
pub fn is_uuid(input: &str, version: Option<usize>) -> bool {
    if !UUID_SHAPE.is_match(input) {
        return false;
    }
    let Ok(uuid) = Uuid::parse_str(input) else {
        return false;
    };
    match version {
        None => true,
        Some(version) => {
            uuid.get_version_num() == version && uuid.get_variant() == Variant::RFC4122
        }
    }
}
