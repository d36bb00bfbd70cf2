pub mod health;
pub mod pacientes;
pub mod triajes;

pub use health::{patient_health_handler, triage_health_handler};
pub use pacientes::{
    create_patient_handler, delete_patient_handler, get_patient_handler, update_patient_handler,
};
pub use triajes::{create_triage_handler, get_triage_handler, list_triage_handler};
