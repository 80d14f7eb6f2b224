//! Form state: the active payload type plus the field values of every type.
//!
//! Values of inactive types are kept so switching tabs back and forth never
//! loses input. Readers get owned snapshots, never references into the store.

use crate::payload::{
    EmailFields, FieldSet, PayloadType, PhoneFields, SmsFields, TextFields, UrlFields,
    VcardFields, WifiFields, WifiSecurity,
};

/// Identifies one editable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldId {
    Url,
    Text,
    WifiSsid,
    WifiPassword,
    WifiSecurity,
    VcardName,
    VcardPhone,
    VcardEmail,
    VcardCompany,
    EmailAddress,
    EmailSubject,
    PhoneNumber,
    SmsNumber,
    SmsMessage,
}

impl FieldId {
    /// Fields shown for a payload type, in display order.
    pub fn for_type(t: PayloadType) -> &'static [FieldId] {
        match t {
            PayloadType::Url => &[FieldId::Url],
            PayloadType::Text => &[FieldId::Text],
            PayloadType::Wifi => &[
                FieldId::WifiSsid,
                FieldId::WifiPassword,
                FieldId::WifiSecurity,
            ],
            PayloadType::Vcard => &[
                FieldId::VcardName,
                FieldId::VcardPhone,
                FieldId::VcardEmail,
                FieldId::VcardCompany,
            ],
            PayloadType::Email => &[FieldId::EmailAddress, FieldId::EmailSubject],
            PayloadType::Phone => &[FieldId::PhoneNumber],
            PayloadType::Sms => &[FieldId::SmsNumber, FieldId::SmsMessage],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldId::Url => "URL",
            FieldId::Text => "Text",
            FieldId::WifiSsid => "Network name (SSID)",
            FieldId::WifiPassword => "Password",
            FieldId::WifiSecurity => "Security",
            FieldId::VcardName => "Full name",
            FieldId::VcardPhone => "Phone",
            FieldId::VcardEmail => "Email",
            FieldId::VcardCompany => "Company (optional)",
            FieldId::EmailAddress => "Email address",
            FieldId::EmailSubject => "Subject (optional)",
            FieldId::PhoneNumber | FieldId::SmsNumber => "Phone number",
            FieldId::SmsMessage => "Message (optional)",
        }
    }

    /// Hint shown while the field is empty.
    pub fn placeholder(self) -> &'static str {
        match self {
            FieldId::Url => "https://example.com",
            FieldId::Text => "Type some text...",
            FieldId::WifiSsid => "WiFi name",
            FieldId::WifiPassword => "WiFi password",
            FieldId::WifiSecurity => "",
            FieldId::VcardName => "Mario Rossi",
            FieldId::VcardPhone | FieldId::PhoneNumber | FieldId::SmsNumber => "+39 123 456 7890",
            FieldId::VcardEmail => "mario@example.com",
            FieldId::VcardCompany => "Company name",
            FieldId::EmailAddress => "someone@example.com",
            FieldId::EmailSubject => "Email subject",
            FieldId::SmsMessage => "Message text...",
        }
    }

    /// Choice fields are cycled instead of typed.
    pub fn is_choice(self) -> bool {
        self == FieldId::WifiSecurity
    }
}

/// Field values for all payload types plus the active selector.
#[derive(Clone, Debug, Default)]
pub struct FormState {
    active: PayloadType,
    url: UrlFields,
    text: TextFields,
    wifi: WifiFields,
    vcard: VcardFields,
    email: EmailFields,
    phone: PhoneFields,
    sms: SmsFields,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_type(&self) -> PayloadType {
        self.active
    }

    /// Switch the active type; returns true when it changed.
    pub fn set_active(&mut self, t: PayloadType) -> bool {
        let changed = self.active != t;
        self.active = t;
        changed
    }

    /// Snapshot of the active field set.
    pub fn active_fields(&self) -> FieldSet {
        self.fields_of(self.active)
    }

    /// Snapshot of any type's field set.
    pub fn fields_of(&self, t: PayloadType) -> FieldSet {
        match t {
            PayloadType::Url => FieldSet::Url(self.url.clone()),
            PayloadType::Text => FieldSet::Text(self.text.clone()),
            PayloadType::Wifi => FieldSet::Wifi(self.wifi.clone()),
            PayloadType::Vcard => FieldSet::Vcard(self.vcard.clone()),
            PayloadType::Email => FieldSet::Email(self.email.clone()),
            PayloadType::Phone => FieldSet::Phone(self.phone.clone()),
            PayloadType::Sms => FieldSet::Sms(self.sms.clone()),
        }
    }

    /// Current value of a field as displayed text.
    pub fn value(&self, id: FieldId) -> &str {
        match id {
            FieldId::Url => &self.url.url,
            FieldId::Text => &self.text.text,
            FieldId::WifiSsid => &self.wifi.ssid,
            FieldId::WifiPassword => &self.wifi.password,
            FieldId::WifiSecurity => self.wifi.security.as_str(),
            FieldId::VcardName => &self.vcard.full_name,
            FieldId::VcardPhone => &self.vcard.phone,
            FieldId::VcardEmail => &self.vcard.email,
            FieldId::VcardCompany => &self.vcard.company,
            FieldId::EmailAddress => &self.email.address,
            FieldId::EmailSubject => &self.email.subject,
            FieldId::PhoneNumber => &self.phone.number,
            FieldId::SmsNumber => &self.sms.number,
            FieldId::SmsMessage => &self.sms.message,
        }
    }

    /// Store a typed value; returns true when the stored value changed.
    /// Choice fields ignore typed input.
    pub fn set_value(&mut self, id: FieldId, value: String) -> bool {
        let slot = match id {
            FieldId::WifiSecurity => return false,
            FieldId::Url => &mut self.url.url,
            FieldId::Text => &mut self.text.text,
            FieldId::WifiSsid => &mut self.wifi.ssid,
            FieldId::WifiPassword => &mut self.wifi.password,
            FieldId::VcardName => &mut self.vcard.full_name,
            FieldId::VcardPhone => &mut self.vcard.phone,
            FieldId::VcardEmail => &mut self.vcard.email,
            FieldId::VcardCompany => &mut self.vcard.company,
            FieldId::EmailAddress => &mut self.email.address,
            FieldId::EmailSubject => &mut self.email.subject,
            FieldId::PhoneNumber => &mut self.phone.number,
            FieldId::SmsNumber => &mut self.sms.number,
            FieldId::SmsMessage => &mut self.sms.message,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn wifi_security(&self) -> WifiSecurity {
        self.wifi.security
    }

    /// Advance the Wi-Fi security mode and return the new one.
    pub fn cycle_wifi_security(&mut self) -> WifiSecurity {
        self.wifi.security = self.wifi.security.next();
        self.wifi.security
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;

    #[test]
    fn active_fields_follow_the_selector() {
        let mut form = FormState::new();
        assert_eq!(form.active_fields().payload_type(), PayloadType::Url);
        assert!(form.set_active(PayloadType::Sms));
        assert!(!form.set_active(PayloadType::Sms));
        assert_eq!(form.active_fields().payload_type(), PayloadType::Sms);
    }

    #[test]
    fn inactive_values_survive_tab_switches() {
        let mut form = FormState::new();
        form.set_value(FieldId::Url, "https://a.example".into());
        form.set_active(PayloadType::Phone);
        form.set_value(FieldId::PhoneNumber, "+39 1".into());
        form.set_active(PayloadType::Url);
        assert_eq!(payload::format(&form.active_fields()), "https://a.example");
        assert_eq!(form.value(FieldId::PhoneNumber), "+39 1");
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let mut form = FormState::new();
        form.set_active(PayloadType::Text);
        form.set_value(FieldId::Text, "before".into());
        let snap = form.active_fields();
        form.set_value(FieldId::Text, "after".into());
        assert_eq!(payload::format(&snap), "before");
    }

    #[test]
    fn set_value_reports_changes_only() {
        let mut form = FormState::new();
        assert!(form.set_value(FieldId::VcardName, "Mario".into()));
        assert!(!form.set_value(FieldId::VcardName, "Mario".into()));
        assert!(!form.set_value(FieldId::WifiSecurity, "WEP".into()));
        assert_eq!(form.wifi_security(), WifiSecurity::Wpa);
    }

    #[test]
    fn wifi_security_cycles() {
        let mut form = FormState::new();
        assert_eq!(form.cycle_wifi_security(), WifiSecurity::Wep);
        assert_eq!(form.cycle_wifi_security(), WifiSecurity::NoPass);
        assert_eq!(form.value(FieldId::WifiSecurity), "nopass");
        assert_eq!(form.cycle_wifi_security(), WifiSecurity::Wpa);
    }

    #[test]
    fn every_type_lists_its_own_fields() {
        assert_eq!(FieldId::for_type(PayloadType::Wifi).len(), 3);
        assert_eq!(FieldId::for_type(PayloadType::Vcard).len(), 4);
        assert!(FieldId::for_type(PayloadType::Wifi).iter().any(|f| f.is_choice()));
    }
}
