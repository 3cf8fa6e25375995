use serde::Deserialize;

/// Contact-form message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactMessage {
    pub name: Option<String>,
    pub email: Option<String>,
    pub text: Option<String>,
}

/// Mailing-list signup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailSignup {
    pub email: Option<String>,
}
