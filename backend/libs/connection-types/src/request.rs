use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::state::ConnectionState;

/// A connection request as returned by both tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    #[serde(rename = "id_conexion")]
    pub id: i64,
    #[serde(rename = "numero_solicitud")]
    pub request_number: i64,
    #[serde(rename = "id_persona")]
    pub person_id: i64,
    #[serde(rename = "cliente")]
    pub client_name: String,
    #[serde(rename = "id_plan")]
    pub plan_id: i64,
    #[serde(rename = "plan")]
    pub plan_name: String,
    #[serde(rename = "id_direccion")]
    pub address_id: i64,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "id_distrito")]
    pub district_id: i64,
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
    #[serde(rename = "estado")]
    pub state: ConnectionState,
    pub nap: Option<String>,
    pub vlan: Option<i32>,
    #[serde(rename = "puerto")]
    pub port: Option<i32>,
    #[serde(rename = "observaciones")]
    pub observations: Option<String>,
    #[serde(rename = "fecha_solicitud")]
    pub requested_at: DateTime<Utc>,
    #[serde(rename = "fecha_resolucion")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Address data for an address that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewAddress {
    #[serde(rename = "calle")]
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[serde(rename = "numero")]
    #[validate(length(min = 1, max = 20))]
    pub number: String,
    #[serde(rename = "id_distrito")]
    #[validate(range(min = 1))]
    pub district_id: i64,
    #[serde(rename = "piso_depto", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    #[serde(rename = "referencia", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub reference: Option<String>,
}

/// Where the connection goes: an existing address or one to create with the request.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressRef {
    Existing(i64),
    New(NewAddress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOrigin {
    /// The customer submitted it for themselves
    #[serde(rename = "cliente")]
    SelfService,
    /// Staff submitted it on the customer's behalf
    Staff,
}

/// Body of `POST /api/v1/conexiones` (customer self-service).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_self_service_address"))]
pub struct SelfServiceConnectionBody {
    #[serde(rename = "id_plan")]
    #[validate(range(min = 1))]
    pub plan_id: i64,
    #[serde(rename = "id_direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub address_id: Option<i64>,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub address: Option<NewAddress>,
    #[serde(rename = "latitud")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub observations: Option<String>,
}

/// Body of `POST /api/v1/admin/conexiones` (staff-assisted, explicit target person).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_assisted_address"))]
pub struct AssistedConnectionBody {
    #[serde(rename = "id_persona")]
    #[validate(range(min = 1))]
    pub person_id: i64,
    #[serde(rename = "id_plan")]
    #[validate(range(min = 1))]
    pub plan_id: i64,
    #[serde(rename = "id_direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub address_id: Option<i64>,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub address: Option<NewAddress>,
    #[serde(rename = "latitud")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(rename = "factibilidad_inmediata", default)]
    pub immediate_feasibility: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64))]
    pub nap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 4094))]
    pub vlan: Option<i32>,
    #[serde(rename = "puerto", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub port: Option<i32>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub observations: Option<String>,
}

/// Body of `POST /internal/conexiones`: what the gateway forwards after its own checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_address"))]
pub struct CreateConnectionRequest {
    #[serde(rename = "id_persona")]
    #[validate(range(min = 1))]
    pub person_id: i64,
    #[serde(rename = "origen")]
    pub origin: SubmissionOrigin,
    #[serde(rename = "id_plan")]
    #[validate(range(min = 1))]
    pub plan_id: i64,
    #[serde(rename = "id_direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub address_id: Option<i64>,
    #[serde(rename = "direccion", default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub address: Option<NewAddress>,
    #[serde(rename = "latitud")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(rename = "factibilidad_inmediata", default)]
    pub immediate_feasibility: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 64))]
    pub nap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 4094))]
    pub vlan: Option<i32>,
    #[serde(rename = "puerto", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub port: Option<i32>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub observations: Option<String>,
}

impl CreateConnectionRequest {
    /// Self-service submission for the person in the caller's token.
    pub fn self_service(person_id: i64, body: SelfServiceConnectionBody) -> Self {
        Self {
            person_id,
            origin: SubmissionOrigin::SelfService,
            plan_id: body.plan_id,
            address_id: body.address_id,
            address: body.address,
            latitude: body.latitude,
            longitude: body.longitude,
            immediate_feasibility: false,
            nap: None,
            vlan: None,
            port: None,
            observations: body.observations,
        }
    }

    pub fn assisted(body: AssistedConnectionBody) -> Self {
        Self {
            person_id: body.person_id,
            origin: SubmissionOrigin::Staff,
            plan_id: body.plan_id,
            address_id: body.address_id,
            address: body.address,
            latitude: body.latitude,
            longitude: body.longitude,
            immediate_feasibility: body.immediate_feasibility,
            nap: body.nap,
            vlan: body.vlan,
            port: body.port,
            observations: body.observations,
        }
    }

    /// The address reference, once `validate()` has checked exactly one is present.
    pub fn address_ref(&self) -> Option<AddressRef> {
        match (self.address_id, &self.address) {
            (Some(id), None) => Some(AddressRef::Existing(id)),
            (None, Some(address)) => Some(AddressRef::New(address.clone())),
            _ => None,
        }
    }
}

/// Body of `confirmar-factibilidad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConfirmFeasibility {
    #[validate(length(min = 1, max = 64))]
    pub nap: String,
    #[validate(range(min = 1, max = 4094))]
    pub vlan: i32,
    #[serde(rename = "puerto", default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub port: Option<i32>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub observations: Option<String>,
}

/// Body of `rechazar-factibilidad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RejectFeasibility {
    #[serde(rename = "motivo")]
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

fn exactly_one_address(address_id: Option<i64>, address: Option<&NewAddress>) -> Result<(), ValidationError> {
    if address_id.is_some() == address.is_some() {
        let mut err = ValidationError::new("direccion");
        err.message = Some("exactly one of id_direccion or direccion is required".into());
        return Err(err);
    }
    Ok(())
}

fn validate_self_service_address(body: &SelfServiceConnectionBody) -> Result<(), ValidationError> {
    exactly_one_address(body.address_id, body.address.as_ref())
}

fn validate_assisted_address(body: &AssistedConnectionBody) -> Result<(), ValidationError> {
    exactly_one_address(body.address_id, body.address.as_ref())
}

fn validate_create_address(body: &CreateConnectionRequest) -> Result<(), ValidationError> {
    exactly_one_address(body.address_id, body.address.as_ref())
}

/// Flatten validator output into one line that names every offending field by the name the
/// client sent.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut problems = Vec::new();
    collect_problems(errors, None, &mut problems);
    problems.sort();

    if problems.is_empty() {
        "invalid request body".to_string()
    } else {
        problems.join("; ")
    }
}

fn collect_problems(errors: &ValidationErrors, prefix: Option<&str>, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let field: &str = field.as_ref();
        let name = match (prefix, field) {
            (_, "__all__") => prefix.map(str::to_string),
            (Some(prefix), field) => Some(format!("{prefix}.{}", wire_name(field))),
            (None, field) => Some(wire_name(field).to_string()),
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    out.push(match &name {
                        Some(name) => format!("{name}: {}", describe(err)),
                        None => describe(err),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_problems(nested, name.as_deref(), out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item = format!("{}[{index}]", name.as_deref().unwrap_or_default());
                    collect_problems(nested, Some(&item), out);
                }
            }
        }
    }
}

/// Validator keys errors by Rust field name; the body uses the serde names.
fn wire_name(field: &str) -> &str {
    match field {
        "person_id" => "id_persona",
        "plan_id" => "id_plan",
        "address_id" => "id_direccion",
        "address" => "direccion",
        "latitude" => "latitud",
        "longitude" => "longitud",
        "port" => "puerto",
        "observations" => "observaciones",
        "reason" => "motivo",
        "street" => "calle",
        "number" => "numero",
        "district_id" => "id_distrito",
        "unit" => "piso_depto",
        "reference" => "referencia",
        other => other,
    }
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    let param = |key: &str| err.params.get(key).map(|value| value.to_string());
    let limits = match (param("min"), param("max")) {
        (Some(min), Some(max)) => format!("between {min} and {max}"),
        (Some(min), None) => format!("at least {min}"),
        (None, Some(max)) => format!("at most {max}"),
        (None, None) => "within bounds".to_string(),
    };

    match err.code.as_ref() {
        "range" => format!("must be {limits}"),
        "length" => format!("length must be {limits}"),
        "email" => "must be a valid email address".to_string(),
        code => format!("failed {code} check"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_body(value: serde_json::Value) -> CreateConnectionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_wire_names() {
        let body = create_body(json!({
            "id_persona": 5,
            "origen": "cliente",
            "id_plan": 7,
            "id_direccion": 42,
            "latitud": -31.4,
            "longitud": -64.2
        }));

        assert_eq!(body.origin, SubmissionOrigin::SelfService);
        assert!(!body.immediate_feasibility);
        assert_eq!(body.address_ref(), Some(AddressRef::Existing(42)));
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_both_address_forms_rejected() {
        let body = create_body(json!({
            "id_persona": 5,
            "origen": "staff",
            "id_plan": 7,
            "id_direccion": 42,
            "direccion": {"calle": "San Martín", "numero": "120", "id_distrito": 3},
            "latitud": -31.4,
            "longitud": -64.2
        }));

        let errors = body.validate().unwrap_err();
        assert!(describe_validation_errors(&errors).contains("id_direccion"));
        assert_eq!(body.address_ref(), None);
    }

    #[test]
    fn test_missing_address_rejected() {
        let body = create_body(json!({
            "id_persona": 5,
            "origen": "staff",
            "id_plan": 7,
            "latitud": -31.4,
            "longitud": -64.2
        }));

        assert!(body.validate().is_err());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let body = create_body(json!({
            "id_persona": 5,
            "origen": "cliente",
            "id_plan": 7,
            "id_direccion": 42,
            "latitud": -131.4,
            "longitud": -64.2
        }));

        let errors = body.validate().unwrap_err();
        assert_eq!(
            describe_validation_errors(&errors),
            "latitud: must be between -90.0 and 90.0"
        );
    }

    #[test]
    fn test_nested_address_errors_use_body_names() {
        let body = create_body(json!({
            "id_persona": 5,
            "origen": "cliente",
            "id_plan": 0,
            "direccion": {"calle": "", "numero": "120", "id_distrito": 3},
            "latitud": -31.4,
            "longitud": -64.2
        }));

        let message = describe_validation_errors(&body.validate().unwrap_err());
        assert!(message.starts_with("direccion.calle: length must be between"));
        assert!(message.contains("; id_plan: must be at least"));
        assert!(!message.contains("plan_id"));
    }

    #[test]
    fn test_confirm_vlan_range() {
        let confirm: ConfirmFeasibility =
            serde_json::from_value(json!({"nap": "NAP-01", "vlan": 5000})).unwrap();
        assert!(confirm.validate().is_err());

        let confirm: ConfirmFeasibility =
            serde_json::from_value(json!({"nap": "NAP-01", "vlan": 120, "puerto": 4})).unwrap();
        assert!(confirm.validate().is_ok());
        assert_eq!(confirm.port, Some(4));
    }

    #[test]
    fn test_reject_requires_reason() {
        let reject: RejectFeasibility = serde_json::from_value(json!({"motivo": ""})).unwrap();
        assert!(reject.validate().is_err());
    }

    #[test]
    fn test_self_service_never_carries_immediate_feasibility() {
        let body: SelfServiceConnectionBody = serde_json::from_value(json!({
            "id_plan": 7,
            "id_direccion": 42,
            "latitud": -31.4,
            "longitud": -64.2,
            "factibilidad_inmediata": true,
            "nap": "NAP-01"
        }))
        .unwrap();

        let request = CreateConnectionRequest::self_service(5, body);
        assert!(!request.immediate_feasibility);
        assert_eq!(request.nap, None);
        assert_eq!(request.origin, SubmissionOrigin::SelfService);
    }
}
