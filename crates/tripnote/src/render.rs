use textwrap::wrap;
use tripnote_core::auth::Session;
use tripnote_core::forms::ValidationErrors;
use tripnote_core::services::{Trip, TripNote};

const WIDTH: usize = 80;

pub fn truncate(value: &str, max_len: usize) -> String {
    let mut chars = value.chars();
    let mut collected = String::new();
    for _ in 0..max_len.saturating_sub(1) {
        match chars.next() {
            Some(ch) => collected.push(ch),
            None => return value.to_owned(),
        }
    }
    if chars.next().is_some() {
        collected.push('…');
        collected
    } else {
        value.to_owned()
    }
}

pub fn render_session(session: &Session) {
    println!(
        "Signed in as {} ({})",
        session.email().unwrap_or("-"),
        session.user_id()
    );
    if let Some(expiry) = session.expires_at {
        println!("Session expires at {expiry} (UTC).");
    }
}

pub fn render_trip_list(trips: &[Trip]) {
    println!(
        "{:<36} {:<24} {:<18} {:<10} {:<10}",
        "ID", "TITLE", "DESTINATION", "START", "END"
    );
    println!("{}", "-".repeat(102));
    for trip in trips {
        println!(
            "{:<36} {:<24} {:<18} {:<10} {:<10}",
            truncate(&trip.id, 36),
            truncate(&trip.title, 24),
            truncate(&trip.destination, 18),
            trip.start_date,
            trip.end_date
        );
    }
}

pub fn render_trip(trip: &Trip) {
    println!("{} ({})", trip.title, trip.id);
    println!("Destination: {}", trip.destination);
    println!("Dates: {} → {}", trip.start_date, trip.end_date);
    if let Some(description) = trip.description.as_deref() {
        print_body(description);
    }
}

pub fn render_note_list(notes: &[TripNote]) {
    println!("{:<36} {:<10} {:<32}", "ID", "DATE", "TITLE");
    println!("{}", "-".repeat(80));
    for note in notes {
        println!(
            "{:<36} {:<10} {:<32}",
            truncate(&note.id, 36),
            note.note_date,
            truncate(&note.title, 32)
        );
    }
}

pub fn render_note(note: &TripNote) {
    println!("{} · {} ({})", note.note_date, note.title, note.id);
    print_body(&note.content);
}

pub fn render_validation(errors: &ValidationErrors) {
    for issue in errors.issues() {
        eprintln!("  {}: {}", issue.field_path, issue.message);
    }
}

fn print_body(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!();
    for line in wrap(trimmed, WIDTH) {
        println!("{line}");
    }
}
