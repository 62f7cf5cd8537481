//! Typed AT command builder.
//!
//! Every command the firmware sends is a variant of [`AtCommand`]; its
//! `Display` impl produces the exact wire text without the line
//! terminator, which [`CommandLink`](super::CommandLink) appends.

use core::fmt;

/// Ctrl-Z, ends an SMS body in text mode.
pub const SMS_TERMINATOR: u8 = 0x1A;

/// Hayes/3GPP commands understood by SIM800-class modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// `AT`
    Attention,
    /// `ATI`
    Identify,
    /// `AT+CPIN?`
    SimStatus,
    /// `AT+CSQ`
    SignalQuality,
    /// `AT+CIMI`
    Imsi,
    /// `AT+CCID`
    Iccid,
    /// `AT+CMGF=1`
    SmsTextMode,
    /// `AT+CMGS="<number>"`
    SmsSend { recipient: &'a str },
    /// `ATD<number>;` (voice call)
    Dial { number: &'a str },
    /// `ATH`
    HangUp,
    /// `AT+CREG=<n>`
    SetRegistrationReport(u8),
    /// `AT+CREG?`
    QueryRegistration,
    /// `AT+COPS?`
    QueryOperator,
    /// `AT+COPS=?`
    ScanOperators,
    /// `AT+COPS=0`
    AutoOperator,
    /// `AT+COPS=1,2,"<mccmnc>"`
    ManualOperator { code: &'a str },
    /// `AT+CFUN=<n>`
    SetFunctionality(u8),
    /// `AT+CFUN?`
    QueryFunctionality,
}

impl fmt::Display for AtCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attention => f.write_str("AT"),
            Self::Identify => f.write_str("ATI"),
            Self::SimStatus => f.write_str("AT+CPIN?"),
            Self::SignalQuality => f.write_str("AT+CSQ"),
            Self::Imsi => f.write_str("AT+CIMI"),
            Self::Iccid => f.write_str("AT+CCID"),
            Self::SmsTextMode => f.write_str("AT+CMGF=1"),
            Self::SmsSend { recipient } => write!(f, "AT+CMGS=\"{recipient}\""),
            Self::Dial { number } => write!(f, "ATD{number};"),
            Self::HangUp => f.write_str("ATH"),
            Self::SetRegistrationReport(n) => write!(f, "AT+CREG={n}"),
            Self::QueryRegistration => f.write_str("AT+CREG?"),
            Self::QueryOperator => f.write_str("AT+COPS?"),
            Self::ScanOperators => f.write_str("AT+COPS=?"),
            Self::AutoOperator => f.write_str("AT+COPS=0"),
            Self::ManualOperator { code } => write!(f, "AT+COPS=1,2,\"{code}\""),
            Self::SetFunctionality(n) => write!(f, "AT+CFUN={n}"),
            Self::QueryFunctionality => f.write_str("AT+CFUN?"),
        }
    }
}
