use serde::Serialize;

use crate::cognito::IdentityTokenClaims;

/// The authenticated caller, derived from a verified identity token
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
}

impl From<&IdentityTokenClaims> for Principal {
    fn from(claims: &IdentityTokenClaims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims
                .username
                .clone()
                .unwrap_or_else(|| claims.sub.clone()),
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            email: claims.email.clone(),
        }
    }
}

impl Principal {
    /// Given and family name joined, falling back to the username
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

/// Access token of the current request, inserted by the session gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
