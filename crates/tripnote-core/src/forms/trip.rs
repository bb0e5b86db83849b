use crate::services::{NewNote, NewTrip};

use super::{Checker, ValidationErrors};

const INVALID_DATE: &str = "Enter a valid date (YYYY-MM-DD)";

/// Add/edit trip form. Dates are entered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Default)]
pub struct TripForm {
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

impl TripForm {
    pub fn validate(&self) -> Result<NewTrip, ValidationErrors> {
        let mut checker = Checker::default();
        checker
            .required("title", &self.title, "Required Title")
            .min_chars("title", &self.title, 3, "Title must be at least 3 characters")
            .required("destination", &self.destination, "Destination is required")
            .min_chars(
                "destination",
                &self.destination,
                2,
                "Destination must be at least 2 characters",
            )
            .required("startDate", &self.start_date, "Start date is required")
            .required("endDate", &self.end_date, "End date is required");

        let start = checker.date("startDate", &self.start_date, INVALID_DATE);
        let end = checker.date("endDate", &self.end_date, INVALID_DATE);
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                checker.push("endDate", "End date must be after start date");
            }
        }
        let (start_date, end_date) = checker.into_result(start.zip(end))?;

        Ok(NewTrip {
            title: self.title.clone(),
            destination: self.destination.clone(),
            description: self.description.clone().unwrap_or_default(),
            start_date,
            end_date,
        })
    }
}

/// Create/update note form.
#[derive(Debug, Clone, Default)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    pub note_date: String,
}

impl NoteForm {
    pub fn validate(&self) -> Result<NewNote, ValidationErrors> {
        let mut checker = Checker::default();
        checker
            .required("title", &self.title, "Title is required")
            .min_chars("title", &self.title, 2, "Title must be at least 2 characters")
            .required("content", &self.content, "Note content is required")
            .required("noteDate", &self.note_date, "Date is required");
        let note_date = checker.date("noteDate", &self.note_date, INVALID_DATE);
        let note_date = checker.into_result(note_date)?;

        Ok(NewNote {
            note_date,
            title: self.title.clone(),
            content: self.content.clone(),
        })
    }
}
