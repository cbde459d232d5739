//! Intake of incident reports and SOS requests from users.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use super::sequence::{next_incident_id, next_sos_request_id};
use super::session::SessionContext;
use super::store::{DocumentStore, StoreError};
use crate::models::incident::ReportIssueRequest;
use crate::models::sos_request::{TriggerSosRequest, SOURCE_USER_DASHBOARD};
use crate::models::{Incident, NewIncident, NewSosRequest, SosRequest};

pub const MISSING_REPORT_FIELDS: &str = "Please fill in all required fields before submitting.";

/// Incident type used when the reporter picks none.
pub const DEFAULT_INCIDENT_TYPE: &str = "Other";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Files incident reports and raises SOS requests.
pub struct IntakeService {
    store: Arc<dyn DocumentStore>,
}

impl IntakeService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stores a new incident with the next incident number.
    ///
    /// Description and location are required once trimmed; nothing is
    /// written otherwise.
    pub async fn report_issue(
        &self,
        session: &SessionContext,
        request: ReportIssueRequest,
    ) -> Result<Incident, IntakeError> {
        request.validate()?;

        let incident_type = shared::validation::non_blank(request.incident_type.as_deref())
            .unwrap_or_else(|| DEFAULT_INCIDENT_TYPE.to_string());
        let description = request.description.trim();
        let location = request.location.trim();
        if description.is_empty() || location.is_empty() {
            return Err(IntakeError::Validation(MISSING_REPORT_FIELDS.to_string()));
        }

        let latest = self.store.latest_incident_number().await?;
        let incident_id = next_incident_id(latest.as_deref());

        let incident = self
            .store
            .insert_incident(NewIncident {
                incident_id,
                incident_type,
                description: description.to_string(),
                location: location.to_string(),
                reported_by: session.roll.clone(),
                notes: shared::validation::non_blank(request.notes.as_deref()),
            })
            .await?;

        info!(
            incident_id = %incident.incident_id,
            incident_type = %incident.incident_type,
            "Incident reported"
        );
        Ok(incident)
    }

    /// Raises an SOS with the next request id.
    ///
    /// If the latest id cannot be read the seed is used.
    pub async fn trigger_sos(
        &self,
        session: &SessionContext,
        request: TriggerSosRequest,
    ) -> Result<SosRequest, IntakeError> {
        request.validate()?;

        let latest = match self.store.latest_request_id().await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(error = %e, "Unable to determine latest SOS ID, defaulting to seed");
                None
            }
        };

        let sos = self
            .store
            .insert_sos(NewSosRequest {
                request_id: next_sos_request_id(latest),
                location: request.location,
                reported_by: session.roll.clone(),
                source: SOURCE_USER_DASHBOARD.to_string(),
            })
            .await?;

        info!(request_id = sos.request_id, "SOS raised");
        Ok(sos)
    }
}
