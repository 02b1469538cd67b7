//! Appointment Scheduler view
//!
//! Create-only: book an appointment, watch the booked list grow.

use std::sync::Arc;

use super::error::{Notice, ViewResult};
use super::form::required;
use super::page::Page;
use crate::models::Appointment;
use crate::store::{DocumentStore, NewDocument};
use crate::sync::{LiveList, Record, ViewState};

pub const MISSING_FIELDS: &str = "Please fill in all fields.";

/// Input of the booking form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentForm {
    pub patient_name: String,
    /// Local date-time, e.g. `2025-06-01T09:30`; not checked for validity
    pub appointment_time: String,
}

/// The appointment scheduler page
pub struct AppointmentsView {
    page: Page<Appointment>,
    pub form: AppointmentForm,
}

impl AppointmentsView {
    pub async fn mount(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            page: Page::mount(store).await,
            form: AppointmentForm::default(),
        }
    }

    pub fn state(&self) -> ViewState<Appointment> {
        self.page.state()
    }

    pub fn list_mut(&mut self) -> &mut LiveList<Appointment> {
        self.page.list_mut()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.page.notice()
    }

    /// Submit the form; clears it once the store accepted the booking
    pub async fn submit(&mut self) -> ViewResult<()> {
        let result = self.create().await;
        if result.is_ok() {
            self.form = AppointmentForm::default();
        }
        self.page.settle("book appointment", result)
    }

    /// Fill the form and submit it
    pub async fn book(
        &mut self,
        patient_name: impl Into<String>,
        appointment_time: impl Into<String>,
    ) -> ViewResult<()> {
        self.form = AppointmentForm {
            patient_name: patient_name.into(),
            appointment_time: appointment_time.into(),
        };
        self.submit().await
    }

    async fn create(&self) -> ViewResult<()> {
        let patient_name = required(
            Appointment::PATIENT_NAME,
            &self.form.patient_name,
            MISSING_FIELDS,
        )?;
        let appointment_time = required(
            Appointment::APPOINTMENT_TIME,
            &self.form.appointment_time,
            MISSING_FIELDS,
        )?;

        let document = NewDocument::new()
            .field(Appointment::PATIENT_NAME, patient_name)
            .field(Appointment::APPOINTMENT_TIME, appointment_time)
            .field(
                Appointment::CREATED_AT,
                chrono::Utc::now().timestamp_millis(),
            );

        self.page
            .store()
            .add(Appointment::COLLECTION, document)
            .await?;
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.page.unmount();
    }
}
