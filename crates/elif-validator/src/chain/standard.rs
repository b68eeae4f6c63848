//! One builder method per built-in rule

use super::ChainBuilder;
use crate::error::ConfigurationError;
use crate::rules::{
    DecimalOptions, EmailOptions, EmptyOptions, FloatOptions, FqdnOptions, HashAlgorithm,
    IntOptions, IssnOptions, Iso8601Options, LengthOptions, MacAddressOptions, NumericOptions,
    UrlOptions,
};
use serde::Serialize;
use serde_json::Value;

impl ChainBuilder {
    fn rule(self, rule_id: &str) -> Self {
        self.add_standard_validation(rule_id, Vec::new())
    }

    /// Serialize `options` as the single argument of `rule_id`
    fn rule_with<T: Serialize>(self, rule_id: &str, options: T) -> Self {
        match serde_json::to_value(options) {
            Ok(value) => self.add_standard_validation(rule_id, vec![value]),
            Err(e) => self.fail(ConfigurationError::InvalidArguments {
                rule: rule_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn rule_with_optional<T: Serialize>(self, rule_id: &str, option: Option<T>) -> Self {
        match option {
            Some(option) => self.rule_with(rule_id, option),
            None => self.rule(rule_id),
        }
    }

    pub fn contains(self, seed: impl Into<String>) -> Self {
        self.rule_with("contains", seed.into())
    }

    pub fn equals(self, comparison: impl Into<String>) -> Self {
        self.rule_with("equals", comparison.into())
    }

    /// Later than `date`, or than now when `None`
    pub fn is_after(self, date: Option<&str>) -> Self {
        self.rule_with_optional("isAfter", date)
    }

    /// Earlier than `date`, or than now when `None`
    pub fn is_before(self, date: Option<&str>) -> Self {
        self.rule_with_optional("isBefore", date)
    }

    /// Letters only; `locale` is one of `en-US` (default), `de-DE`, `fr-FR`, `es-ES`, `ru-RU`, `any`
    pub fn is_alpha(self, locale: Option<&str>) -> Self {
        self.rule_with_optional("isAlpha", locale)
    }

    pub fn is_alphanumeric(self, locale: Option<&str>) -> Self {
        self.rule_with_optional("isAlphanumeric", locale)
    }

    pub fn is_ascii(self) -> Self {
        self.rule("isAscii")
    }

    pub fn is_base32(self) -> Self {
        self.rule("isBase32")
    }

    pub fn is_base64(self) -> Self {
        self.rule("isBase64")
    }

    pub fn is_bic(self) -> Self {
        self.rule("isBIC")
    }

    pub fn is_boolean(self) -> Self {
        self.rule("isBoolean")
    }

    pub fn is_byte_length(self, options: LengthOptions) -> Self {
        self.rule_with("isByteLength", options)
    }

    pub fn is_credit_card(self) -> Self {
        self.rule("isCreditCard")
    }

    pub fn is_data_uri(self) -> Self {
        self.rule("isDataURI")
    }

    pub fn is_decimal(self, options: DecimalOptions) -> Self {
        self.rule_with("isDecimal", options)
    }

    pub fn is_divisible_by(self, number: i64) -> Self {
        self.rule_with("isDivisibleBy", number)
    }

    pub fn is_email(self, options: EmailOptions) -> Self {
        self.rule_with("isEmail", options)
    }

    pub fn is_empty(self, options: EmptyOptions) -> Self {
        self.rule_with("isEmpty", options)
    }

    pub fn is_fqdn(self, options: FqdnOptions) -> Self {
        self.rule_with("isFQDN", options)
    }

    pub fn is_float(self, options: FloatOptions) -> Self {
        self.rule_with("isFloat", options)
    }

    pub fn is_full_width(self) -> Self {
        self.rule("isFullWidth")
    }

    pub fn is_half_width(self) -> Self {
        self.rule("isHalfWidth")
    }

    pub fn is_hash(self, algorithm: HashAlgorithm) -> Self {
        self.rule_with("isHash", algorithm)
    }

    pub fn is_hex_color(self) -> Self {
        self.rule("isHexColor")
    }

    pub fn is_hexadecimal(self) -> Self {
        self.rule("isHexadecimal")
    }

    /// `version` is 4 or 6; either when `None`
    pub fn is_ip(self, version: Option<u8>) -> Self {
        self.rule_with_optional("isIP", version)
    }

    pub fn is_ip_range(self, version: Option<u8>) -> Self {
        self.rule_with_optional("isIPRange", version)
    }

    /// `version` is 10 or 13; either when `None`
    pub fn is_isbn(self, version: Option<u8>) -> Self {
        self.rule_with_optional("isISBN", version)
    }

    pub fn is_isin(self) -> Self {
        self.rule("isISIN")
    }

    pub fn is_iso8601(self, options: Iso8601Options) -> Self {
        self.rule_with("isISO8601", options)
    }

    pub fn is_isrc(self) -> Self {
        self.rule("isISRC")
    }

    pub fn is_issn(self, options: IssnOptions) -> Self {
        self.rule_with("isISSN", options)
    }

    /// Value must be one of `values` (compared as strings)
    pub fn is_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.add_standard_validation("isIn", vec![Value::Array(values)])
    }

    pub fn is_int(self, options: IntOptions) -> Self {
        self.rule_with("isInt", options)
    }

    pub fn is_json(self) -> Self {
        self.rule("isJSON")
    }

    pub fn is_jwt(self) -> Self {
        self.rule("isJWT")
    }

    pub fn is_lat_long(self) -> Self {
        self.rule("isLatLong")
    }

    pub fn is_length(self, options: LengthOptions) -> Self {
        self.rule_with("isLength", options)
    }

    pub fn is_lowercase(self) -> Self {
        self.rule("isLowercase")
    }

    pub fn is_mac_address(self, options: MacAddressOptions) -> Self {
        self.rule_with("isMACAddress", options)
    }

    pub fn is_magnet_uri(self) -> Self {
        self.rule("isMagnetURI")
    }

    pub fn is_md5(self) -> Self {
        self.rule("isMD5")
    }

    pub fn is_mime_type(self) -> Self {
        self.rule("isMimeType")
    }

    pub fn is_mongo_id(self) -> Self {
        self.rule("isMongoId")
    }

    pub fn is_multibyte(self) -> Self {
        self.rule("isMultibyte")
    }

    pub fn is_numeric(self, options: NumericOptions) -> Self {
        self.rule_with("isNumeric", options)
    }

    pub fn is_octal(self) -> Self {
        self.rule("isOctal")
    }

    pub fn is_port(self) -> Self {
        self.rule("isPort")
    }

    pub fn is_rfc3339(self) -> Self {
        self.rule("isRFC3339")
    }

    pub fn is_slug(self) -> Self {
        self.rule("isSlug")
    }

    pub fn is_surrogate_pair(self) -> Self {
        self.rule("isSurrogatePair")
    }

    pub fn is_uppercase(self) -> Self {
        self.rule("isUppercase")
    }

    pub fn is_url(self, options: UrlOptions) -> Self {
        self.rule_with("isURL", options)
    }

    /// `version` is `"1"` to `"8"` or `"all"` (the default)
    pub fn is_uuid(self, version: Option<&str>) -> Self {
        self.rule_with_optional("isUUID", version)
    }

    pub fn is_variable_width(self) -> Self {
        self.rule("isVariableWidth")
    }

    /// Every character must appear in `chars`
    pub fn is_whitelisted(self, chars: impl Into<String>) -> Self {
        self.rule_with("isWhitelisted", chars.into())
    }

    /// Regex match; `modifiers` takes `i`, `m` and `s`
    pub fn matches(self, pattern: impl Into<String>, modifiers: Option<&str>) -> Self {
        let mut args = vec![Value::String(pattern.into())];
        if let Some(modifiers) = modifiers {
            args.push(Value::String(modifiers.to_string()));
        }
        self.add_standard_validation("matches", args)
    }
}
