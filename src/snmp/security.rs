//! Maps [`SnmpConfig`] onto SNMP security parameters.

use async_snmp::{Auth, AuthProtocol, PrivProtocol, SecurityLevel};
use tracing::warn;

use crate::config::{SnmpConfig, SnmpVersion};

pub const DEFAULT_AUTH_PROTOCOL: AuthProtocol = AuthProtocol::Sha1;
pub const DEFAULT_PRIV_PROTOCOL: PrivProtocol = PrivProtocol::Aes128;

/// Security settings of one SNMP session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
    /// v1 or v2c
    Community { version: SnmpVersion, community: String },
    /// v3 User Security Model
    Usm {
        user: String,
        level: SecurityLevel,
        auth: Option<(AuthProtocol, String)>,
        privacy: Option<(PrivProtocol, String)>,
    },
}

pub fn parse_security_level(level: &str) -> SecurityLevel {
    match level.trim().to_ascii_lowercase().as_str() {
        "authpriv" => SecurityLevel::AuthPriv,
        "authnopriv" => SecurityLevel::AuthNoPriv,
        "" | "noauthnopriv" => SecurityLevel::NoAuthNoPriv,
        other => {
            warn!("unknown SNMPv3 security level {other:?}, using NoAuthNoPriv");
            SecurityLevel::NoAuthNoPriv
        }
    }
}

pub fn parse_auth_protocol(name: &str) -> AuthProtocol {
    match name.trim().to_ascii_uppercase().as_str() {
        "MD5" => AuthProtocol::Md5,
        "SHA" | "SHA1" => AuthProtocol::Sha1,
        "SHA224" => AuthProtocol::Sha224,
        "SHA256" => AuthProtocol::Sha256,
        "SHA384" => AuthProtocol::Sha384,
        "SHA512" => AuthProtocol::Sha512,
        "" => DEFAULT_AUTH_PROTOCOL,
        other => {
            warn!("unknown SNMPv3 auth protocol {other:?}, using SHA");
            DEFAULT_AUTH_PROTOCOL
        }
    }
}

pub fn parse_priv_protocol(name: &str) -> PrivProtocol {
    match name.trim().to_ascii_uppercase().as_str() {
        "DES" => PrivProtocol::Des,
        "AES" | "AES128" => PrivProtocol::Aes128,
        "AES192" => PrivProtocol::Aes192,
        "AES256" => PrivProtocol::Aes256,
        "" => DEFAULT_PRIV_PROTOCOL,
        other => {
            warn!("unknown SNMPv3 privacy protocol {other:?}, using AES");
            DEFAULT_PRIV_PROTOCOL
        }
    }
}

impl Security {
    /// Auth credentials are only set above NoAuthNoPriv and privacy
    /// credentials only at AuthPriv.
    pub fn from_config(config: &SnmpConfig) -> Self {
        match config.version {
            SnmpVersion::V1 | SnmpVersion::V2c => Security::Community {
                version: config.version,
                community: config.community.clone(),
            },
            SnmpVersion::V3 => {
                let level = parse_security_level(&config.v3_security_level);
                let auth = (level >= SecurityLevel::AuthNoPriv).then(|| {
                    (
                        parse_auth_protocol(&config.v3_auth_protocol),
                        config.v3_auth_pass.clone(),
                    )
                });
                let privacy = (level == SecurityLevel::AuthPriv).then(|| {
                    (
                        parse_priv_protocol(&config.v3_priv_protocol),
                        config.v3_priv_pass.clone(),
                    )
                });
                Security::Usm {
                    user: config.v3_user.clone(),
                    level,
                    auth,
                    privacy,
                }
            }
        }
    }

    pub fn to_auth(&self) -> Auth {
        match self {
            Security::Community {
                version: SnmpVersion::V1,
                community,
            } => Auth::v1(community.as_str()),
            Security::Community { community, .. } => Auth::v2c(community.as_str()),
            Security::Usm {
                user,
                auth,
                privacy,
                ..
            } => {
                let mut builder = Auth::usm(user.as_str());
                if let Some((protocol, pass)) = auth {
                    builder = builder.auth(*protocol, pass.as_str());
                }
                if let Some((protocol, pass)) = privacy {
                    builder = builder.privacy(*protocol, pass.as_str());
                }
                builder.into()
            }
        }
    }
}
