use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A stored record: an open JSON object persisted verbatim
pub type Record = Map<String, JsonValue>;

pub const PATIENT_REQUIRED_FIELDS: &[&str] = &[
    "dni",
    "nombres",
    "apellidos",
    "sexo",
    "fechaNacimiento",
    "correo",
    "celular",
    "direccion",
    "distrito",
    "provincia",
    "departamento",
];

pub const TRIAGE_REQUIRED_FIELDS: &[&str] = &[
    "dni",
    "fechaHora",
    "presionArterial",
    "frecuenciaCardiaca",
    "saturacionOxigeno",
    "temperaturaCorporal",
    "pesoKg",
    "tallaM",
];

/// Composite key of a triage record, also the item shape of the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriageKey {
    pub dni: String,
    #[serde(rename = "fechaHora")]
    pub fecha_hora: String,
}

impl TriageKey {
    pub fn new(dni: impl Into<String>, fecha_hora: impl Into<String>) -> Self {
        Self {
            dni: dni.into(),
            fecha_hora: fecha_hora.into(),
        }
    }
}

/// Query parameters for the triage list endpoint
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TriageListQuery {
    /// National ID of the patient
    pub dni: Option<String>,
}

/// Response type for the triage list endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriageListResponse {
    pub items: Vec<TriageKey>,
}

/// Confirmation body for operations that return no record
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Overwrite the fields of `target` named in `changes`, leaving the rest untouched.
pub fn merge_patch(target: &mut Record, changes: &Record) {
    for (field, value) in changes {
        target.insert(field.clone(), value.clone());
    }
}
