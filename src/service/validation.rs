//! Request validation and light normalization (trimming) of incoming payloads.

use crate::error::AppError;
use crate::model::{NewEducationRecord, NewPerson, NewSecondaryContact, Patch, PersonPatch};
use regex::Regex;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> Result<&'static Regex, AppError> {
    if let Some(re) = EMAIL.get() {
        return Ok(re);
    }
    let re = Regex::new(EMAIL_PATTERN).map_err(|e| AppError::Validation(format!("invalid email pattern: {}", e)))?;
    Ok(EMAIL.get_or_init(|| re))
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create payload, trimming names and emails in place.
    pub fn validate_new_person(person: &mut NewPerson) -> Result<(), AppError> {
        person.full_name = required_text("full_name", &person.full_name)?;
        person.primary_email = email("primary_email", &person.primary_email)?;
        for contact in person.secondary_contacts.iter_mut() {
            Self::validate_secondary_contact(contact)?;
        }
        for record in person.education_records.iter_mut() {
            Self::validate_education_record(record)?;
        }
        Ok(())
    }

    /// Validate only the parts of a patch that are present. Required attributes may not be
    /// cleared with an explicit null.
    pub fn validate_patch(patch: &mut PersonPatch) -> Result<(), AppError> {
        match &mut patch.full_name {
            Patch::Null => return Err(AppError::Validation("full_name cannot be null".into())),
            Patch::Set(name) => *name = required_text("full_name", name)?,
            Patch::Unset => {}
        }
        match &mut patch.primary_email {
            Patch::Null => return Err(AppError::Validation("primary_email cannot be null".into())),
            Patch::Set(addr) => *addr = email("primary_email", addr)?,
            Patch::Unset => {}
        }
        if let Some(contacts) = patch.secondary_contacts.as_mut() {
            for contact in contacts.iter_mut() {
                Self::validate_secondary_contact(contact)?;
            }
        }
        if let Some(records) = patch.education_records.as_mut() {
            for record in records.iter_mut() {
                Self::validate_education_record(record)?;
            }
        }
        Ok(())
    }

    pub fn validate_secondary_contact(contact: &mut NewSecondaryContact) -> Result<(), AppError> {
        contact.email = email("email", &contact.email)?;
        Ok(())
    }

    pub fn validate_education_record(record: &mut NewEducationRecord) -> Result<(), AppError> {
        record.institution_name = required_text("institution_name", &record.institution_name)?;
        if let (Some(start), Some(end)) = (record.start_date, record.end_date) {
            if end < start {
                return Err(AppError::Validation("end_date must not be before start_date".into()));
            }
        }
        Ok(())
    }

    pub fn is_valid_email(s: &str) -> Result<bool, AppError> {
        Ok(email_regex()?.is_match(s))
    }
}

fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn email(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if !RequestValidator::is_valid_email(trimmed)? {
        return Err(AppError::Validation(format!("{} must be a valid email", field)));
    }
    Ok(trimmed.to_string())
}
