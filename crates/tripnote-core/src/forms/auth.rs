use super::{Checker, ValidationErrors};

const INVALID_EMAIL: &str = "Enter a valid email";
const SHORT_PASSWORD: &str = "Password must be at least 6 characters";

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checker = Checker::default();
        checker
            .email("email", &self.email, INVALID_EMAIL)
            .min_chars("password", &self.password, 6, SHORT_PASSWORD);
        checker.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checker = Checker::default();
        checker
            .email("email", &self.email, INVALID_EMAIL)
            .min_chars("password", &self.password, 6, SHORT_PASSWORD)
            .min_chars("confirmPassword", &self.confirm_password, 6, SHORT_PASSWORD);
        if self.password != self.confirm_password {
            checker.push("confirmPassword", "Passwords do not match");
        }
        checker.finish()
    }
}

/// Email-only form for magic-link sign-in.
#[derive(Debug, Clone, Default)]
pub struct MagicLinkForm {
    pub email: String,
}

impl MagicLinkForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checker = Checker::default();
        checker.email("email", &self.email, INVALID_EMAIL);
        checker.finish()
    }
}
