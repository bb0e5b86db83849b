use std::io::{self, BufRead, Write};

use tokio::task;
use tripnote_core::auth::AuthError;
use tripnote_core::i18n::{Locale, Text};
use url::Url;

/// Read one line from stdin off the async runtime. End of input reads as cancellation.
pub async fn read_line(label: String) -> Result<String, AuthError> {
    task::spawn_blocking(move || {
        eprint!("{label}");
        io::stderr().flush()?;
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(AuthError::UserCancelled);
        }
        Ok(input.trim_end_matches(['\r', '\n']).to_owned())
    })
    .await
    .map_err(|_| AuthError::UserCancelled)?
}

/// Ask for a secret without echoing it. End of input reads as cancellation.
pub async fn password(label: &'static str) -> Result<String, AuthError> {
    task::spawn_blocking(move || cancelled_on_eof(rpassword::prompt_password(label)))
        .await
        .map_err(|_| AuthError::UserCancelled)?
}

fn cancelled_on_eof(input: io::Result<String>) -> Result<String, AuthError> {
    match input {
        Ok(value) => Ok(value),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Err(AuthError::UserCancelled),
        Err(err) => Err(AuthError::Io(err)),
    }
}

pub async fn redirect_url() -> Result<String, AuthError> {
    read_line("Paste the redirect URL (leave empty to cancel): ".to_owned()).await
}

pub fn print_authorization_url(url: &Url) -> Result<(), AuthError> {
    eprintln!("\nSign in by visiting:\n  {url}\n");
    Ok(())
}

/// `value` when given, otherwise ask for it.
pub async fn field(value: Option<String>, label: &str) -> Result<String, AuthError> {
    match value {
        Some(value) => Ok(value),
        None => read_line(format!("{label}: ")).await,
    }
}

/// Ask a yes/no question in the active locale. Anything but an explicit yes declines.
pub async fn confirm(locale: Locale, question: Text, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    match read_line(format!("{} [y/N] ", locale.text(question))).await {
        Ok(answer) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "e" | "evet"
    )
}
