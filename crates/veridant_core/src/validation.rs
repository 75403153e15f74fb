//! crates/veridant_core/src/validation.rs
//!
//! Input checks run before anything is persisted or numbered.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::{
    NewApplication, NewCertificate, NewContact, NewEmployee, NewMou, NewOfferLetter, NewProgram,
};
use crate::error::{FieldError, ServiceError, ServiceResult};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()-]{7,20}$").expect("valid phone regex"));

/// Collects field errors and turns them into one `ServiceError::Validation`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        }
        self
    }

    pub fn email(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        } else if !EMAIL_RE.is_match(value.trim()) {
            self.errors.push(FieldError::new(field, "is not a valid email address"));
        }
        self
    }

    pub fn phone(&mut self, field: &'static str, value: &str) -> &mut Self {
        if !PHONE_RE.is_match(value.trim()) {
            self.errors.push(FieldError::new(field, "is not a valid phone number"));
        }
        self
    }

    pub fn check(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn date_order(
        &mut self,
        field: &'static str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> &mut Self {
        if end.is_some_and(|end| end < start) {
            self.errors.push(FieldError::new(field, "must not be before the start date"));
        }
        self
    }

    pub fn finish(&mut self) -> ServiceResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn validate_application(application: &NewApplication) -> ServiceResult<()> {
    Validator::new()
        .required("full_name", &application.full_name)
        .email("email", &application.email)
        .phone("phone", &application.phone)
        .required("college_name", &application.college_name)
        .required("degree", &application.degree)
        .check(
            "graduation_year",
            application
                .graduation_year
                .is_none_or(|year| (1950..=2100).contains(&year)),
            "is out of range",
        )
        .finish()
}

pub fn validate_contact(contact: &NewContact) -> ServiceResult<()> {
    Validator::new()
        .required("name", &contact.name)
        .email("email", &contact.email)
        .required("subject", &contact.subject)
        .required("message", &contact.message)
        .finish()
}

pub fn validate_program(program: &NewProgram) -> ServiceResult<()> {
    Validator::new()
        .required("title", &program.title)
        .required("department", &program.department)
        .check("duration_weeks", program.duration_weeks > 0, "must be positive")
        .check(
            "stipend",
            program.stipend.is_none_or(|s| s >= 0),
            "must not be negative",
        )
        .finish()
}

pub fn validate_certificate(certificate: &NewCertificate) -> ServiceResult<()> {
    Validator::new()
        .required("recipient_name", &certificate.recipient_name)
        .required("program_title", &certificate.program_title)
        .required("certificate_type", &certificate.certificate_type)
        .date_order("valid_until", certificate.issue_date, certificate.valid_until)
        .finish()
}

pub fn validate_offer_letter(offer: &NewOfferLetter) -> ServiceResult<()> {
    Validator::new()
        .required("candidate_name", &offer.candidate_name)
        .email("candidate_email", &offer.candidate_email)
        .required("position", &offer.position)
        .required("department", &offer.department)
        .check(
            "stipend",
            offer.stipend.is_none_or(|s| s >= 0),
            "must not be negative",
        )
        .date_order("end_date", offer.start_date, offer.end_date)
        .finish()
}

pub fn validate_mou(mou: &NewMou) -> ServiceResult<()> {
    Validator::new()
        .required("college_name", &mou.college_name)
        .required("college_address", &mou.college_address)
        .required("college_signatory", &mou.college_signatory)
        .check(
            "college_email",
            mou.college_email
                .as_deref()
                .is_none_or(|email| EMAIL_RE.is_match(email.trim())),
            "is not a valid email address",
        )
        .required("company_signatory", &mou.company_signatory)
        .required("purpose", &mou.purpose)
        .date_order("end_date", mou.start_date, Some(mou.end_date))
        .finish()
}

pub fn validate_employee(employee: &NewEmployee) -> ServiceResult<()> {
    Validator::new()
        .required("full_name", &employee.full_name)
        .email("email", &employee.email)
        .required("designation", &employee.designation)
        .required("department", &employee.department)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> NewApplication {
        NewApplication {
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: "+91 98765 43210".into(),
            college_name: "IIT Madras".into(),
            degree: "B.Tech".into(),
            graduation_year: Some(2027),
            ..Default::default()
        }
    }

    #[test]
    fn complete_application_passes() {
        assert!(validate_application(&application()).is_ok());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let mut bad = application();
        bad.full_name = "  ".into();
        bad.email = "not-an-email".into();
        bad.graduation_year = Some(1800);

        match validate_application(&bad) {
            Err(ServiceError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["full_name", "email", "graduation_year"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let mou = NewMou {
            college_name: "College".into(),
            college_address: "Road 1".into(),
            college_signatory: "Dean".into(),
            college_email: None,
            company_signatory: "CEO".into(),
            purpose: "Internships".into(),
            start_date: start,
            end_date: start.pred_opt().unwrap(),
            issued_by: None,
        };
        assert!(matches!(
            validate_mou(&mou),
            Err(ServiceError::Validation(e)) if e[0].field == "end_date"
        ));
    }
}
