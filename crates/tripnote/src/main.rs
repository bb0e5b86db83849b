mod prompt;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tripnote_core::auth::{
    AuthOutcome, AuthService, BackendSessionStore, BrowserPreference, BrowserSurface,
    CallbackRegistry, DeepLinkEvent, DeepLinkListener, FileCredentialStore, GoTrueClient,
    InitialRoute, ManualBrowser, OAuthProvider, SessionBootstrapper, SignInMethod,
};
use tripnote_core::config::BackendConfig;
use tripnote_core::forms::{
    MagicLinkForm, NoteForm, SignInForm, SignUpForm, TripForm, ValidationErrors, DATE_FORMAT,
};
use tripnote_core::i18n::{Locale, Text};
use tripnote_core::rest::{DataResult, RestClient};
use tripnote_core::services::{
    NoteService, NoteUpdate, RecordList, ServiceResponse, TripService, TripUpdate,
};

const DEFAULT_PROFILE: &str = "default";

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan trips and keep dated notes from the terminal")]
struct Cli {
    /// Profile name for the stored session
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    profile: String,
    /// Language for messages (en, tr)
    #[arg(long = "lang", global = true, default_value_t = Locale::En)]
    locale: Locale,
    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log-level", global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in, sign out and session inspection
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Trip plans
    #[command(subcommand)]
    Trip(TripCommand),
    /// Dated notes attached to a trip
    #[command(subcommand)]
    Note(NoteCommand),
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Sign in with a provider, a password, or a magic link
    Login(LoginArgs),
    /// Create an account with email and password
    Signup(SignupArgs),
    /// Sign out and forget the stored session
    Logout(LogoutArgs),
    /// Show whether a valid session is stored
    Status(JsonArgs),
    /// Hand a redirect URL received from the browser to the app
    Callback(CallbackArgs),
}

#[derive(Subcommand, Debug)]
enum TripCommand {
    /// List your trips, newest first
    List(JsonArgs),
    /// Plan a new trip
    Add(TripAddArgs),
    /// Change fields of an existing trip
    Edit(TripEditArgs),
    /// Delete a trip
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    /// List the notes of a trip by date
    List(NoteListArgs),
    /// Add a note to a trip
    Add(NoteAddArgs),
    /// Change fields of an existing note
    Edit(NoteEditArgs),
    /// Delete a note
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct JsonArgs {
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Sign-in method (oauth, password, magic-link)
    #[arg(long, default_value_t = SignInMethod::OAuth)]
    method: SignInMethod,
    /// Shorthand for --method password
    #[arg(long, conflicts_with = "magic_link")]
    password: bool,
    /// Shorthand for --method magic-link
    #[arg(long = "magic-link")]
    magic_link: bool,
    /// Identity provider for OAuth sign-in
    #[arg(long, default_value = "google")]
    provider: OAuthProvider,
    /// Account email; prompted when missing
    #[arg(long)]
    email: Option<String>,
    /// Print the sign-in URL instead of launching a browser
    #[arg(long)]
    manual: bool,
    /// Stop waiting for the browser after this many seconds
    #[arg(long = "timeout")]
    timeout_secs: Option<u64>,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

impl LoginArgs {
    fn sign_in_method(&self) -> SignInMethod {
        if self.password {
            SignInMethod::Password
        } else if self.magic_link {
            SignInMethod::MagicLink
        } else {
            self.method
        }
    }
}

#[derive(Args, Debug)]
struct SignupArgs {
    /// Account email; prompted when missing
    #[arg(long)]
    email: Option<String>,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct LogoutArgs {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CallbackArgs {
    /// Redirect URL, e.g. tripnote://auth/callback#access_token=...&refresh_token=...
    url: String,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct TripFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,
}

#[derive(Args, Debug)]
struct TripAddArgs {
    #[command(flatten)]
    fields: TripFields,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct TripEditArgs {
    /// Trip id
    id: String,
    #[command(flatten)]
    fields: TripFields,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct NoteFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Note date (YYYY-MM-DD); today when adding without one
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args, Debug)]
struct NoteListArgs {
    /// Trip id
    trip_id: String,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct NoteAddArgs {
    /// Trip id
    trip_id: String,
    #[command(flatten)]
    fields: NoteFields,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct NoteEditArgs {
    /// Note id
    id: String,
    #[command(flatten)]
    fields: NoteFields,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    /// Record id
    id: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let app = App::new(&cli.profile, cli.locale)?;
    match cli.command {
        Commands::Auth(cmd) => match cmd {
            AuthCommand::Login(args) => auth_login(&app, args).await?,
            AuthCommand::Signup(args) => auth_signup(&app, args).await?,
            AuthCommand::Logout(args) => auth_logout(&app, args).await?,
            AuthCommand::Status(args) => auth_status(&app, args).await?,
            AuthCommand::Callback(args) => auth_callback(&app, args).await?,
        },
        Commands::Trip(cmd) => match cmd {
            TripCommand::List(args) => trip_list(&app, args).await?,
            TripCommand::Add(args) => trip_add(&app, args).await?,
            TripCommand::Edit(args) => trip_edit(&app, args).await?,
            TripCommand::Delete(args) => trip_delete(&app, args).await?,
        },
        Commands::Note(cmd) => match cmd {
            NoteCommand::List(args) => note_list(&app, args).await?,
            NoteCommand::Add(args) => note_add(&app, args).await?,
            NoteCommand::Edit(args) => note_edit(&app, args).await?,
            NoteCommand::Delete(args) => note_delete(&app, args).await?,
        },
    }
    Ok(())
}

/// Compact log lines on stderr. `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Process-wide wiring shared by every command.
struct App {
    config: BackendConfig,
    store: Arc<BackendSessionStore>,
    registry: CallbackRegistry,
    locale: Locale,
}

impl App {
    fn new(profile: &str, locale: Locale) -> Result<Self> {
        let config = BackendConfig::from_env();
        let client = GoTrueClient::new(config.clone()).context("failed to build auth client")?;
        let credentials = FileCredentialStore::with_default_locator()
            .context("unable to initialise credential store")?;
        debug!(profile, configured = config.is_configured(), "client ready");

        Ok(Self {
            store: Arc::new(BackendSessionStore::new(client, credentials, profile)),
            config,
            registry: CallbackRegistry::new(),
            locale,
        })
    }

    fn auth(&self, open_browser: bool) -> AuthService<BackendSessionStore, impl BrowserSurface> {
        let browser = ManualBrowser::new(
            open_browser,
            prompt::print_authorization_url,
            prompt::redirect_url,
        );
        AuthService::new(
            self.store.clone(),
            browser,
            self.config.redirect_url().clone(),
            self.registry.clone(),
        )
        .with_locale(self.locale)
    }

    fn rest(&self) -> Result<RestClient> {
        RestClient::new(self.config.clone(), self.store.clone())
            .context("failed to build REST client")
    }

    fn say(&self, text: Text) {
        println!("{}", self.locale.text(text));
    }
}

async fn auth_login(app: &App, args: LoginArgs) -> Result<()> {
    let outcome = match args.sign_in_method() {
        SignInMethod::OAuth => {
            let preference = if args.manual {
                BrowserPreference::with_browser(false)
            } else {
                BrowserPreference::detect()
            };
            let mut service = app.auth(preference.browser_available());
            if let Some(secs) = args.timeout_secs {
                service = service.with_browser_timeout(Duration::from_secs(secs));
            }
            service.sign_in_with_oauth(args.provider).await
        }
        SignInMethod::Password => {
            let form = SignInForm {
                email: prompt::field(args.email, "Email").await?,
                password: prompt::password("Password: ").await?,
            };
            if let Err(errors) = form.validate() {
                return invalid(&errors, args.json);
            }
            app.auth(false)
                .sign_in_with_password(&form.email, &form.password)
                .await
        }
        SignInMethod::MagicLink => {
            let form = MagicLinkForm {
                email: prompt::field(args.email, "Email").await?,
            };
            if let Err(errors) = form.validate() {
                return invalid(&errors, args.json);
            }
            let outcome = app.auth(false).sign_in_with_magic_link(&form.email).await;
            return report(app, &outcome, args.json, Text::MagicLinkSent);
        }
    };
    report(app, &outcome, args.json, Text::SignedIn)
}

async fn auth_signup(app: &App, args: SignupArgs) -> Result<()> {
    let form = SignUpForm {
        email: prompt::field(args.email, "Email").await?,
        password: prompt::password("Password: ").await?,
        confirm_password: prompt::password("Confirm password: ").await?,
    };
    if let Err(errors) = form.validate() {
        return invalid(&errors, args.json);
    }

    let outcome = app.auth(false).sign_up(&form.email, &form.password).await;
    let text = if outcome.session.is_some() {
        Text::SignedIn
    } else {
        Text::SignUpConfirmEmail
    };
    report(app, &outcome, args.json, text)
}

async fn auth_logout(app: &App, args: LogoutArgs) -> Result<()> {
    if !prompt::confirm(app.locale, Text::ConfirmSignOut, args.yes).await {
        return Ok(());
    }
    let outcome = app.auth(false).sign_out().await;
    report(app, &outcome, args.json, Text::SignedOut)
}

async fn auth_status(app: &App, args: JsonArgs) -> Result<()> {
    let route = SessionBootstrapper::new(app.store.clone()).resolve().await;
    if args.json {
        let body = json!({
            "authenticated": route.is_authenticated(),
            "user": route.session().map(|session| &session.user),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match &route {
        InitialRoute::Authenticated(session) => render::render_session(session),
        InitialRoute::Unauthenticated => app.say(Text::NotSignedIn),
    }
    Ok(())
}

async fn auth_callback(app: &App, args: CallbackArgs) -> Result<()> {
    let (listener, mut events) = DeepLinkListener::subscribe(
        app.store.clone(),
        app.registry.clone(),
        app.config.redirect_url().clone(),
    );
    listener.deliver_initial(Some(args.url));
    let event = events.recv().await;
    listener.unsubscribe().await;

    match event.context("callback listener stopped before handling the URL")? {
        DeepLinkEvent::SessionEstablished(session) => {
            report(app, &AuthOutcome::resolved(session), args.json, Text::SignedIn)
        }
        DeepLinkEvent::Duplicate => {
            app.say(Text::CallbackAlreadyHandled);
            Ok(())
        }
        DeepLinkEvent::Ignored { reason } => bail!("callback URL ignored: {reason}"),
        DeepLinkEvent::Failed { kind, message } => {
            if args.json {
                let body = json!({
                    "success": false,
                    "error_message": message,
                    "error_kind": kind,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(anyhow!(message))
        }
    }
}

async fn trip_list(app: &App, args: JsonArgs) -> Result<()> {
    let result = TripService::new(app.rest()?)
        .list()
        .await
        .map(|trips| RecordList::new(trips).into_items());
    emit(args.json, result, |trips| {
        if trips.is_empty() {
            app.say(Text::NoTrips);
        } else {
            render::render_trip_list(trips);
        }
    })
}

async fn trip_add(app: &App, args: TripAddArgs) -> Result<()> {
    let fields = args.fields;
    let form = TripForm {
        title: prompt::field(fields.title, "Title").await?,
        destination: prompt::field(fields.destination, "Destination").await?,
        description: fields.description,
        start_date: prompt::field(fields.start, "Start date (YYYY-MM-DD)").await?,
        end_date: prompt::field(fields.end, "End date (YYYY-MM-DD)").await?,
    };
    let trip = match form.validate() {
        Ok(trip) => trip,
        Err(errors) => return invalid(&errors, args.json),
    };

    let result = TripService::new(app.rest()?).insert(&trip).await;
    emit(args.json, result, |trip| {
        app.say(Text::TripCreated);
        render::render_trip(trip);
    })
}

async fn trip_edit(app: &App, args: TripEditArgs) -> Result<()> {
    let service = TripService::new(app.rest()?);
    let current = service
        .get(&args.id)
        .await
        .map_err(|err| anyhow!(err.user_message()))?;

    let fields = args.fields;
    let form = TripForm {
        title: fields.title.unwrap_or(current.title),
        destination: fields.destination.unwrap_or(current.destination),
        description: fields.description.or(current.description),
        start_date: fields
            .start
            .unwrap_or_else(|| current.start_date.format(DATE_FORMAT).to_string()),
        end_date: fields
            .end
            .unwrap_or_else(|| current.end_date.format(DATE_FORMAT).to_string()),
    };
    let trip = match form.validate() {
        Ok(trip) => trip,
        Err(errors) => return invalid(&errors, args.json),
    };

    let result = service.update(&args.id, &TripUpdate::from(trip)).await;
    emit(args.json, result, |trip| {
        app.say(Text::TripUpdated);
        render::render_trip(trip);
    })
}

async fn trip_delete(app: &App, args: DeleteArgs) -> Result<()> {
    if !prompt::confirm(app.locale, Text::ConfirmDeleteTrip, args.yes).await {
        return Ok(());
    }
    let result = TripService::new(app.rest()?).delete(&args.id).await;
    emit(args.json, result, |_| app.say(Text::TripDeleted))
}

async fn note_list(app: &App, args: NoteListArgs) -> Result<()> {
    let result = NoteService::new(app.rest()?)
        .list(&args.trip_id)
        .await
        .map(|notes| RecordList::new(notes).into_items());
    emit(args.json, result, |notes| {
        if notes.is_empty() {
            app.say(Text::NoNotes);
        } else {
            render::render_note_list(notes);
        }
    })
}

async fn note_add(app: &App, args: NoteAddArgs) -> Result<()> {
    let fields = args.fields;
    let form = NoteForm {
        title: prompt::field(fields.title, "Title").await?,
        content: prompt::field(fields.content, "Note").await?,
        note_date: fields
            .date
            .unwrap_or_else(|| Local::now().date_naive().format(DATE_FORMAT).to_string()),
    };
    let note = match form.validate() {
        Ok(note) => note,
        Err(errors) => return invalid(&errors, args.json),
    };

    let result = NoteService::new(app.rest()?)
        .create(&args.trip_id, &note)
        .await;
    emit(args.json, result, |note| {
        app.say(Text::NoteCreated);
        render::render_note(note);
    })
}

async fn note_edit(app: &App, args: NoteEditArgs) -> Result<()> {
    let service = NoteService::new(app.rest()?);
    let current = service
        .get(&args.id)
        .await
        .map_err(|err| anyhow!(err.user_message()))?;

    let fields = args.fields;
    let form = NoteForm {
        title: fields.title.unwrap_or(current.title),
        content: fields.content.unwrap_or(current.content),
        note_date: fields
            .date
            .unwrap_or_else(|| current.note_date.format(DATE_FORMAT).to_string()),
    };
    let note = match form.validate() {
        Ok(note) => note,
        Err(errors) => return invalid(&errors, args.json),
    };

    let result = service.update(&args.id, &NoteUpdate::from(note)).await;
    emit(args.json, result, |note| {
        app.say(Text::NoteUpdated);
        render::render_note(note);
    })
}

async fn note_delete(app: &App, args: DeleteArgs) -> Result<()> {
    if !prompt::confirm(app.locale, Text::ConfirmDeleteNote, args.yes).await {
        return Ok(());
    }
    let result = NoteService::new(app.rest()?).delete(&args.id).await;
    emit(args.json, result, |_| app.say(Text::NoteDeleted))
}

/// Print an auth outcome. Cancellation is not an error exit.
fn report(app: &App, outcome: &AuthOutcome, json: bool, success: Text) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    }
    if outcome.success {
        if !json {
            app.say(success);
            if let Some(session) = &outcome.session {
                render::render_session(session);
            }
        }
        return Ok(());
    }

    let message = outcome
        .error_message
        .clone()
        .unwrap_or_else(|| app.locale.text(Text::SignInFailed).to_owned());
    if outcome.is_cancelled() {
        if !json {
            println!("{message}");
        }
        return Ok(());
    }
    Err(anyhow!(message))
}

/// Print a data result, either as a JSON envelope or through `render`.
fn emit<T: Serialize>(json: bool, result: DataResult<T>, render: impl FnOnce(&T)) -> Result<()> {
    if json {
        let response = ServiceResponse::from(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return match response.error {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        };
    }
    match result {
        Ok(data) => {
            render(&data);
            Ok(())
        }
        Err(err) => Err(anyhow!(err.user_message())),
    }
}

fn invalid(errors: &ValidationErrors, json: bool) -> Result<()> {
    if json {
        let body = json!({
            "success": false,
            "error": errors.to_string(),
            "issues": errors.issues(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        render::render_validation(errors);
    }
    bail!("{} field(s) need attention", errors.issues().len())
}
