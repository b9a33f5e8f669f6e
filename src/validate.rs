//! Field-level validation helpers shared by the request payload types.
//! Every endpoint validates its payload with these before any persistence
//! call; failures surface as a 400 with one message per offending field.

use time::{Date, OffsetDateTime};

use crate::error::FieldError;

pub fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

pub fn phone(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(FieldError::new(field, "must be exactly 10 digits"));
    }
}

pub fn national_id(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(FieldError::new(field, "must be exactly 12 digits"));
    }
}

pub fn email(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    let valid = match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        errors.push(FieldError::new(field, "must be a valid email address"));
    }
}

pub fn username(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.len() < 3 || value.len() > 30 || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
        errors.push(FieldError::new(field, "must be 3-30 alphanumeric characters"));
    }
}

pub fn password(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.len() < 8 {
        errors.push(FieldError::new(field, "must be at least 8 characters"));
    }
}

pub fn not_future(errors: &mut Vec<FieldError>, field: &'static str, value: Date) {
    if value > OffsetDateTime::now_utc().date() {
        errors.push(FieldError::new(field, "cannot be in the future"));
    }
}
