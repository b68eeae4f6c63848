//! Rules for encoded and structured strings

use super::{pattern, stringify, Arity, FnRule, RuleRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Digest algorithms understood by `isHash`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md4,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Ripemd128,
    Ripemd160,
    Tiger128,
    Tiger160,
    Tiger192,
    Crc32,
    Crc32b,
}

impl HashAlgorithm {
    /// Length of the hex digest
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Crc32 | HashAlgorithm::Crc32b => 8,
            HashAlgorithm::Md4
            | HashAlgorithm::Md5
            | HashAlgorithm::Ripemd128
            | HashAlgorithm::Tiger128 => 32,
            HashAlgorithm::Sha1 | HashAlgorithm::Ripemd160 | HashAlgorithm::Tiger160 => 40,
            HashAlgorithm::Tiger192 => 48,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }
}

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^#?([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$"));
static HEXADECIMAL: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^(0x|0h)?[0-9a-f]+$"));
static OCTAL: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^(0o)?[0-7]+$"));
static BASE32: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z2-7]+=*$"));
static BASE64: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})$")
});
static BASE64_URL: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Za-z0-9_-]+$"));
static MIME_TYPE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r#"(?i)^(application|audio|font|image|message|model|multipart|text|video)/[a-z0-9.\-+_]{1,100}(\s*;\s*[a-z0-9\-_]+=("[^"]*"|[a-z0-9\-_.]+))*$"#,
    )
});
static MAGNET_URI: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)^magnet:\?xt(?:\.1)?=urn:(?:aich|bitprint|btih|ed2k|ed2khash|kzhash|md5|sha1|tree:tiger):[a-z0-9]{32}(?:[a-z0-9]{8})?(&.*)?$",
    )
});
static DATA_MEDIA_TYPE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^[a-z]+/[a-z0-9\-+._]+$"));
static DATA_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^[a-z\-]+=[a-z0-9\-]+$"));
static DATA_PAYLOAD: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^[a-z0-9!$&'()*+,;=\-._~:@/?%\s]*$"));

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry
        .register(FnRule::new("isJSON", Arity::NONE, is_json))
        .register(FnRule::new("isBoolean", Arity::NONE, is_boolean))
        .register(FnRule::new("isHexColor", Arity::NONE, is_hex_color))
        .register(FnRule::new("isHexadecimal", Arity::NONE, is_hexadecimal))
        .register(FnRule::new("isOctal", Arity::NONE, is_octal))
        .register(FnRule::new("isMongoId", Arity::NONE, is_mongo_id))
        .register(FnRule::new("isMD5", Arity::NONE, is_md5))
        .register(FnRule::prepared("isHash", Arity::exactly(1), |args: &[Value]| {
            let algorithm = hash_algorithm(args)?;
            Ok(move |input: &str| is_hash(input, algorithm))
        }))
        .register(FnRule::new("isBase32", Arity::NONE, is_base32))
        .register(FnRule::new("isBase64", Arity::NONE, is_base64))
        .register(FnRule::new("isJWT", Arity::NONE, is_jwt))
        .register(FnRule::new("isMimeType", Arity::NONE, is_mime_type))
        .register(FnRule::new("isMagnetURI", Arity::NONE, is_magnet_uri))
        .register(FnRule::new("isDataURI", Arity::NONE, is_data_uri));
}

/// A JSON object or array; bare primitives don't count
pub fn is_json(input: &str, _args: &[Value]) -> bool {
    matches!(
        serde_json::from_str::<Value>(input),
        Ok(Value::Object(_) | Value::Array(_))
    )
}

pub fn is_boolean(input: &str, _args: &[Value]) -> bool {
    matches!(input, "true" | "false" | "1" | "0")
}

pub fn is_hex_color(input: &str, _args: &[Value]) -> bool {
    HEX_COLOR.is_match(input)
}

pub fn is_hexadecimal(input: &str, _args: &[Value]) -> bool {
    HEXADECIMAL.is_match(input)
}

pub fn is_octal(input: &str, _args: &[Value]) -> bool {
    OCTAL.is_match(input)
}

fn is_hex_of_len(input: &str, len: usize) -> bool {
    input.len() == len && input.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn is_mongo_id(input: &str, _args: &[Value]) -> bool {
    is_hex_of_len(input, 24)
}

pub fn is_md5(input: &str, _args: &[Value]) -> bool {
    is_hex_of_len(input, 32)
}

fn hash_algorithm(args: &[Value]) -> Result<HashAlgorithm, String> {
    args.first()
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .ok_or_else(|| format!("unknown hash algorithm `{}`", stringify(args.first())))
}

pub fn is_hash(input: &str, algorithm: HashAlgorithm) -> bool {
    is_hex_of_len(input, algorithm.hex_len())
}

pub fn is_base32(input: &str, _args: &[Value]) -> bool {
    !input.is_empty() && input.len() % 8 == 0 && BASE32.is_match(input)
}

pub fn is_base64(input: &str, _args: &[Value]) -> bool {
    !input.is_empty() && input.len() % 4 == 0 && BASE64.is_match(input)
}

/// Header and payload as base64url, the signature may be empty
pub fn is_jwt(input: &str, _args: &[Value]) -> bool {
    let parts: Vec<&str> = input.split('.').collect();
    match parts.as_slice() {
        [header, payload] => BASE64_URL.is_match(header) && BASE64_URL.is_match(payload),
        [header, payload, signature] => {
            BASE64_URL.is_match(header)
                && BASE64_URL.is_match(payload)
                && (signature.is_empty() || BASE64_URL.is_match(signature))
        }
        _ => false,
    }
}

pub fn is_mime_type(input: &str, _args: &[Value]) -> bool {
    MIME_TYPE.is_match(input)
}

pub fn is_magnet_uri(input: &str, _args: &[Value]) -> bool {
    MAGNET_URI.is_match(input)
}

pub fn is_data_uri(input: &str, _args: &[Value]) -> bool {
    let Some((header, payload)) = input.split_once(',') else {
        return false;
    };
    let Some(header) = header
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &header[5..])
    else {
        return false;
    };

    let mut attributes: Vec<&str> = header.split(';').collect();
    let base64 = attributes.len() > 1 && attributes.last() == Some(&"base64");
    if base64 {
        attributes.pop();
    }

    let media_type = attributes.remove(0);
    if !media_type.is_empty() && !DATA_MEDIA_TYPE.is_match(media_type) {
        return false;
    }
    if !attributes.iter().all(|attribute| DATA_ATTRIBUTE.is_match(attribute)) {
        return false;
    }

    if base64 {
        is_base64(payload, &[])
    } else {
        DATA_PAYLOAD.is_match(payload)
    }
}
