//! Payload types, per-type field sets and the formatters that turn them into
//! the exact text encoded into the symbol.
//!
//! Every formatter is total: any field content produces some non-empty string.
//! Reserved characters of the WIFI and VCARD mini-syntaxes (`;`, `:`, `\`, `,`)
//! are inserted verbatim, matching what common scanners have always received
//! from this generator.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Substituted when the URL field is empty.
pub const FALLBACK_URL: &str = "https://bi-gen.it";
/// Substituted when the TEXT field is empty.
pub const FALLBACK_TEXT: &str = "Testo di esempio";

/// Characters left alone by `encodeURIComponent`; everything else is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Kind of payload currently being built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PayloadType {
    #[default]
    Url,
    Text,
    Wifi,
    Vcard,
    Email,
    Phone,
    Sms,
}

impl PayloadType {
    /// All types in tab order.
    pub const ALL: [PayloadType; 7] = [
        PayloadType::Url,
        PayloadType::Text,
        PayloadType::Wifi,
        PayloadType::Vcard,
        PayloadType::Email,
        PayloadType::Phone,
        PayloadType::Sms,
    ];

    /// Lowercase identifier used in file names and analytics events.
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadType::Url => "url",
            PayloadType::Text => "text",
            PayloadType::Wifi => "wifi",
            PayloadType::Vcard => "vcard",
            PayloadType::Email => "email",
            PayloadType::Phone => "phone",
            PayloadType::Sms => "sms",
        }
    }

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            PayloadType::Url => "URL",
            PayloadType::Text => "Text",
            PayloadType::Wifi => "WiFi",
            PayloadType::Vcard => "Contact",
            PayloadType::Email => "Email",
            PayloadType::Phone => "Phone",
            PayloadType::Sms => "SMS",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Next tab, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous tab, wrapping around.
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wi-Fi authentication modes understood by the `WIFI:` syntax.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WifiSecurity {
    #[default]
    Wpa,
    Wep,
    NoPass,
}

impl WifiSecurity {
    /// Token written after `T:`.
    pub fn as_str(self) -> &'static str {
        match self {
            WifiSecurity::Wpa => "WPA",
            WifiSecurity::Wep => "WEP",
            WifiSecurity::NoPass => "nopass",
        }
    }

    /// Cycle WPA -> WEP -> nopass -> WPA.
    pub fn next(self) -> Self {
        match self {
            WifiSecurity::Wpa => WifiSecurity::Wep,
            WifiSecurity::Wep => WifiSecurity::NoPass,
            WifiSecurity::NoPass => WifiSecurity::Wpa,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlFields {
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextFields {
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WifiFields {
    pub ssid: String,
    pub password: String,
    pub security: WifiSecurity,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VcardFields {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub company: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailFields {
    pub address: String,
    pub subject: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhoneFields {
    pub number: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmsFields {
    pub number: String,
    pub message: String,
}

/// Field values of exactly one payload type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSet {
    Url(UrlFields),
    Text(TextFields),
    Wifi(WifiFields),
    Vcard(VcardFields),
    Email(EmailFields),
    Phone(PhoneFields),
    Sms(SmsFields),
}

impl FieldSet {
    /// Type this field set belongs to.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            FieldSet::Url(_) => PayloadType::Url,
            FieldSet::Text(_) => PayloadType::Text,
            FieldSet::Wifi(_) => PayloadType::Wifi,
            FieldSet::Vcard(_) => PayloadType::Vcard,
            FieldSet::Email(_) => PayloadType::Email,
            FieldSet::Phone(_) => PayloadType::Phone,
            FieldSet::Sms(_) => PayloadType::Sms,
        }
    }
}

/// Build the payload string for a field set.
pub fn format(fields: &FieldSet) -> String {
    match fields {
        FieldSet::Url(f) => format_url(f),
        FieldSet::Text(f) => format_text(f),
        FieldSet::Wifi(f) => format_wifi(f),
        FieldSet::Vcard(f) => format_vcard(f),
        FieldSet::Email(f) => format_email(f),
        FieldSet::Phone(f) => format_phone(f),
        FieldSet::Sms(f) => format_sms(f),
    }
}

pub fn format_url(f: &UrlFields) -> String {
    if f.url.is_empty() {
        FALLBACK_URL.to_string()
    } else {
        f.url.clone()
    }
}

pub fn format_text(f: &TextFields) -> String {
    if f.text.is_empty() {
        FALLBACK_TEXT.to_string()
    } else {
        f.text.clone()
    }
}

pub fn format_wifi(f: &WifiFields) -> String {
    format!(
        "WIFI:T:{};S:{};P:{};;",
        f.security.as_str(),
        f.ssid,
        f.password
    )
}

/// Fixed-structure vCard 3.0. The full name is split on single spaces: the
/// first token is the given name, the rest (re-joined) the family name.
pub fn format_vcard(f: &VcardFields) -> String {
    let mut parts = f.full_name.split(' ');
    let given = parts.next().unwrap_or_default();
    let family = parts.collect::<Vec<_>>().join(" ");

    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{family};{given}"),
        format!("FN:{}", f.full_name),
    ];
    if !f.company.is_empty() {
        lines.push(format!("ORG:{}", f.company));
    }
    if !f.phone.is_empty() {
        lines.push(format!("TEL:{}", f.phone));
    }
    if !f.email.is_empty() {
        lines.push(format!("EMAIL:{}", f.email));
    }
    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

pub fn format_email(f: &EmailFields) -> String {
    if f.subject.is_empty() {
        format!("mailto:{}", f.address)
    } else {
        format!("mailto:{}?subject={}", f.address, encode_component(&f.subject))
    }
}

pub fn format_phone(f: &PhoneFields) -> String {
    format!("tel:{}", f.number)
}

pub fn format_sms(f: &SmsFields) -> String {
    if f.message.is_empty() {
        format!("sms:{}", f.number)
    } else {
        format!("sms:{}?body={}", f.number, encode_component(&f.message))
    }
}

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}
