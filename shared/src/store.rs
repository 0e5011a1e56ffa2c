//! Store status record
//!
//! Persisted at `tenants/{storeId}/status`. `online` may only be set to
//! `true` by the toggle controller immediately after a fresh complete
//! verdict; it can be set `false` unconditionally.

use serde::{Deserialize, Serialize};

/// Setup progress, mirrored from the completeness verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SetupState {
    #[serde(rename = "configurado")]
    Configurado,
    #[default]
    #[serde(rename = "em_configuracao")]
    EmConfiguracao,
}

/// Store status record
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreStatus {
    /// Whether the store is accepting orders
    #[serde(default)]
    pub online: bool,
    /// Completeness verdict at the last evaluation
    #[serde(rename = "cadastroCompleto", default)]
    pub cadastro_completo: bool,
    #[serde(default)]
    pub setup: SetupState,
    /// Last evaluation timestamp (epoch ms)
    #[serde(rename = "setupUpdatedAt", skip_serializing_if = "Option::is_none")]
    pub setup_updated_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let status = StoreStatus {
            online: true,
            cadastro_completo: true,
            setup: SetupState::Configurado,
            setup_updated_at: Some(42),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["online"], true);
        assert_eq!(json["cadastroCompleto"], true);
        assert_eq!(json["setup"], "configurado");
        assert_eq!(json["setupUpdatedAt"], 42);
    }
}
