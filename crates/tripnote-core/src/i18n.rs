//! User-facing message catalogues.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

/// Messages shown to the user after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    SignedIn,
    SignInCancelled,
    SignInFailed,
    SignInInProgress,
    CallbackAlreadyHandled,
    SignUpFailed,
    SignUpConfirmEmail,
    MagicLinkSent,
    SignedOut,
    SignOutFailed,
    NotSignedIn,
    BackendUnavailable,
    ConfirmSignOut,
    TripCreated,
    TripUpdated,
    TripDeleted,
    ConfirmDeleteTrip,
    NoTrips,
    NoteCreated,
    NoteUpdated,
    NoteDeleted,
    ConfirmDeleteNote,
    NoNotes,
}

impl Locale {
    pub fn text(self, text: Text) -> &'static str {
        match self {
            Locale::En => english(text),
            Locale::Tr => turkish(text),
        }
    }
}

fn english(text: Text) -> &'static str {
    match text {
        Text::SignedIn => "Signed in successfully!",
        Text::SignInCancelled => "Sign-in was cancelled.",
        Text::SignInFailed => "Sign-in failed. Please try again.",
        Text::SignInInProgress => "A sign-in is already in progress.",
        Text::CallbackAlreadyHandled => "This sign-in link was already handled.",
        Text::SignUpFailed => "Registration failed.",
        Text::SignUpConfirmEmail => "Registration successful! Check your email to confirm your account.",
        Text::MagicLinkSent => "Check your email for the sign-in link.",
        Text::SignedOut => "Signed out.",
        Text::SignOutFailed => "Sign out failed.",
        Text::NotSignedIn => "You are not signed in.",
        Text::BackendUnavailable => "The service is not reachable. Check your connection and configuration.",
        Text::ConfirmSignOut => "Are you sure you want to sign out?",
        Text::TripCreated => "Trip plan created successfully!",
        Text::TripUpdated => "Trip updated successfully!",
        Text::TripDeleted => "Trip plan deleted",
        Text::ConfirmDeleteTrip => "Are you sure you want to delete this trip plan?",
        Text::NoTrips => "No trips yet.",
        Text::NoteCreated => "Note created successfully!",
        Text::NoteUpdated => "Note updated successfully!",
        Text::NoteDeleted => "Note deleted",
        Text::ConfirmDeleteNote => "Are you sure you want to delete this note?",
        Text::NoNotes => "No notes for this trip yet.",
    }
}

fn turkish(text: Text) -> &'static str {
    match text {
        Text::SignedIn => "Başarıyla giriş yapıldı!",
        Text::SignInCancelled => "Giriş iptal edildi.",
        Text::SignInFailed => "Giriş başarısız oldu. Lütfen tekrar deneyin.",
        Text::SignInInProgress => "Zaten devam eden bir giriş işlemi var.",
        Text::CallbackAlreadyHandled => "Bu giriş bağlantısı zaten kullanıldı.",
        Text::SignUpFailed => "Kayıt işlemi başarısız.",
        Text::SignUpConfirmEmail => "Kayıt başarılı! Hesabınızı doğrulamak için e-postanızı kontrol edin.",
        Text::MagicLinkSent => "Giriş bağlantısı için e-postanızı kontrol edin.",
        Text::SignedOut => "Çıkış yapıldı.",
        Text::SignOutFailed => "Çıkış yapılamadı.",
        Text::NotSignedIn => "Giriş yapmadınız.",
        Text::BackendUnavailable => "Servise ulaşılamıyor. Bağlantınızı ve yapılandırmanızı kontrol edin.",
        Text::ConfirmSignOut => "Çıkış yapmak istediğinize emin misiniz?",
        Text::TripCreated => "Seyahat planı başarıyla oluşturuldu!",
        Text::TripUpdated => "Seyahat başarıyla güncellendi!",
        Text::TripDeleted => "Seyahat planı silindi",
        Text::ConfirmDeleteTrip => "Bu seyahat planını silmek istediğinize emin misiniz?",
        Text::NoTrips => "Henüz seyahat yok.",
        Text::NoteCreated => "Not başarıyla oluşturuldu!",
        Text::NoteUpdated => "Not başarıyla güncellendi!",
        Text::NoteDeleted => "Not silindi",
        Text::ConfirmDeleteNote => "Bu notu silmek istediğinize emin misiniz?",
        Text::NoNotes => "Bu seyahat için henüz not yok.",
    }
}

impl std::str::FromStr for Locale {
    type Err = InvalidLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "tr" | "tr-tr" => Ok(Locale::Tr),
            other => Err(InvalidLocale(other.to_owned())),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::Tr => "tr",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language '{0}' (expected 'en' or 'tr')")]
pub struct InvalidLocale(pub String);
