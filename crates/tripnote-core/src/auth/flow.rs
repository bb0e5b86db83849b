use std::env;

/// Sign-in methods offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignInMethod {
    #[default]
    OAuth,
    Password,
    MagicLink,
}

/// Whether the system browser can be launched for provider sign-in.
#[derive(Debug, Clone, Copy)]
pub struct BrowserPreference {
    browser_available: bool,
}

impl BrowserPreference {
    /// Detect browser availability from environment variables and the session type.
    pub fn detect() -> Self {
        Self {
            browser_available: browser_available(),
        }
    }

    pub fn with_browser(browser_available: bool) -> Self {
        Self { browser_available }
    }

    /// Whether we should attempt to spawn the system browser automatically.
    pub fn browser_available(&self) -> bool {
        self.browser_available
    }
}

fn browser_available() -> bool {
    if env::var_os("TRIPNOTE_NO_BROWSER").is_some() {
        return false;
    }

    if env::var_os("SSH_CONNECTION").is_some() && env::var_os("DISPLAY").is_none() {
        return false;
    }

    if env::var_os("DISPLAY").is_some() || env::var_os("WAYLAND_DISPLAY").is_some() {
        return true;
    }

    cfg!(target_os = "windows") || cfg!(target_os = "macos")
}

impl std::str::FromStr for SignInMethod {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oauth" | "browser" => Ok(SignInMethod::OAuth),
            "password" => Ok(SignInMethod::Password),
            "magic-link" | "magiclink" | "otp" => Ok(SignInMethod::MagicLink),
            other => Err(InvalidMethod(other.to_owned())),
        }
    }
}

impl std::fmt::Display for SignInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            SignInMethod::OAuth => "oauth",
            SignInMethod::Password => "password",
            SignInMethod::MagicLink => "magic-link",
        };
        write!(f, "{value}")
    }
}

/// Error reported when parsing an unsupported sign-in method.
#[derive(Debug, thiserror::Error)]
#[error("invalid sign-in method '{0}'")]
pub struct InvalidMethod(pub String);
