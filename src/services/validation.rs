//! Boundary rules for create inputs
//!
//! All failures are `InvalidInput` and are decided from the input alone.

use chrono::{Datelike, Utc};

use crate::db::institutions::CreateInstitutionInput;
use crate::db::metrics::RecordMetricInput;
use crate::db::papers::CreatePaperInput;
use crate::db::subjects::CreateSubjectInput;
use crate::db::testimonials::CreateTestimonialInput;
use crate::db::users::CreateUserInput;
use crate::error::ArchiveError;

pub const MIN_ESTABLISHED_YEAR: i32 = 1800;
pub const MIN_EXAM_YEAR: i32 = 2000;
pub const MIN_TESTIMONIAL_CHARS: usize = 10;
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

fn invalid(message: impl Into<String>) -> ArchiveError {
    ArchiveError::InvalidInput(message.into())
}

fn require(field: &str, value: &str) -> Result<(), ArchiveError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} is required", field)));
    }
    Ok(())
}

fn non_negative(field: &str, value: Option<i32>) -> Result<(), ArchiveError> {
    match value {
        Some(n) if n < 0 => Err(invalid(format!("{} must not be negative", field))),
        _ => Ok(()),
    }
}

/// `scheme://rest` with an alphabetic-led scheme and a non-empty rest
pub fn has_url_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Non-empty local part, exactly one `@`, and a dotted domain
pub fn is_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub fn validate_institution(input: &CreateInstitutionInput) -> Result<(), ArchiveError> {
    require("name", &input.name)?;
    require("type", &input.institution_type)?;

    if let Some(year) = input.established_year {
        let current = Utc::now().year();
        if !(MIN_ESTABLISHED_YEAR..=current).contains(&year) {
            return Err(invalid(format!(
                "established_year must be between {} and {}, got {}",
                MIN_ESTABLISHED_YEAR, current, year
            )));
        }
    }

    non_negative("total_students", input.total_students)?;
    non_negative("total_faculty", input.total_faculty)
}

pub fn validate_user(input: &CreateUserInput) -> Result<(), ArchiveError> {
    if !is_email(&input.email) {
        return Err(invalid(format!("email {:?} is not a valid address", input.email)));
    }
    require("name", &input.name)
}

pub fn validate_subject(input: &CreateSubjectInput) -> Result<(), ArchiveError> {
    require("name", &input.name)?;
    require("code", &input.code)
}

pub fn validate_paper(input: &CreatePaperInput) -> Result<(), ArchiveError> {
    require("title", &input.title)?;
    require("exam_type", &input.exam_type)?;
    require("file_url", &input.file_url)?;

    if !has_url_scheme(&input.file_url) {
        return Err(invalid("file_url must be an absolute URL"));
    }
    if input.exam_year < MIN_EXAM_YEAR {
        return Err(invalid(format!(
            "exam_year must be {} or later, got {}",
            MIN_EXAM_YEAR, input.exam_year
        )));
    }
    if input.file_size <= 0 {
        return Err(invalid("file_size must be positive"));
    }
    Ok(())
}

pub fn validate_testimonial(input: &CreateTestimonialInput) -> Result<(), ArchiveError> {
    if input.content.trim().chars().count() < MIN_TESTIMONIAL_CHARS {
        return Err(invalid(format!(
            "content must be at least {} characters",
            MIN_TESTIMONIAL_CHARS
        )));
    }
    if !RATING_RANGE.contains(&input.rating) {
        return Err(invalid(format!(
            "rating must be between 1 and 5, got {}",
            input.rating
        )));
    }
    match input.video_url.as_deref() {
        Some(url) if !has_url_scheme(url) => Err(invalid("video_url must be an absolute URL")),
        _ => Ok(()),
    }
}

pub fn validate_metric(input: &RecordMetricInput) -> Result<(), ArchiveError> {
    require("metric_type", &input.metric_type)
}
