// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const PACIENTES: &str = "/pacientes";
pub const PACIENTE: &str = "/pacientes/{dni}";
pub const TRIAJES: &str = "/triajes";
pub const TRIAJE: &str = "/triajes/{dni}/{fechaHora}";

pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
