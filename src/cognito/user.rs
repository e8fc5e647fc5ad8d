//! Request and response shapes of the Cognito user API calls made with the
//! caller's own access token.

use serde::{Deserialize, Serialize};

/// MFA setting name Cognito reports once TOTP has been enabled
pub const SOFTWARE_TOKEN_MFA: &str = "SOFTWARE_TOKEN_MFA";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A user as returned by `GetUser`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CognitoUser {
    pub username: String,
    pub attributes: Vec<UserAttribute>,
    pub mfa_settings: Vec<String>,
    pub preferred_mfa_setting: Option<String>,
}

impl CognitoUser {
    /// Value of a named attribute such as `given_name`
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    #[must_use]
    pub fn has_totp_enabled(&self) -> bool {
        self.mfa_settings.iter().any(|s| s == SOFTWARE_TOKEN_MFA)
    }

    /// `otpauth://` provisioning URI for authenticator apps
    #[must_use]
    pub fn totp_provisioning_uri(&self, secret: &str) -> String {
        format!(
            "otpauth://totp/AWSCognito:{}?secret={}&issuer=AWSCognito",
            urlencoding::encode(&self.username),
            secret
        )
    }
}

/// Outcome of `VerifySoftwareToken`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    Error,
}

impl VerificationStatus {
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        if status == "SUCCESS" {
            Self::Success
        } else {
            Self::Error
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AccessTokenRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct UpdateUserAttributesRequest<'a> {
    pub access_token: &'a str,
    pub user_attributes: &'a [UserAttribute],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct VerifySoftwareTokenRequest<'a> {
    pub access_token: &'a str,
    pub user_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct MfaSettings {
    pub enabled: bool,
    pub preferred_mfa: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SetUserMfaPreferenceRequest<'a> {
    pub access_token: &'a str,
    pub software_token_mfa_settings: MfaSettings,
}

impl<'a> SetUserMfaPreferenceRequest<'a> {
    pub fn software_token_preferred(access_token: &'a str) -> Self {
        Self {
            access_token,
            software_token_mfa_settings: MfaSettings {
                enabled: true,
                preferred_mfa: true,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct GetUserResponse {
    pub username: String,
    #[serde(default)]
    pub user_attributes: Vec<UserAttribute>,
    #[serde(default, rename = "UserMFASettingList")]
    pub user_mfa_setting_list: Vec<String>,
    #[serde(default, rename = "PreferredMfaSetting")]
    pub preferred_mfa_setting: Option<String>,
}

impl From<GetUserResponse> for CognitoUser {
    fn from(response: GetUserResponse) -> Self {
        Self {
            username: response.username,
            attributes: response.user_attributes,
            mfa_settings: response.user_mfa_setting_list,
            preferred_mfa_setting: response.preferred_mfa_setting,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AssociateSoftwareTokenResponse {
    pub secret_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct VerifySoftwareTokenResponse {
    pub status: Option<String>,
}
