//! Store configuration sections evaluated for completeness
//!
//! A store may only go online when every section's readiness predicate
//! holds. The order of [`Section::ALL`] is the evaluation order and is
//! preserved in the `missing` list shown to the operator.

use serde::{Deserialize, Serialize};

/// One independently-evaluated slice of a store's configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    StoreProfile,
    Payments,
    OpeningHours,
    Menu,
    Delivery,
    Finance,
}

impl Section {
    /// Evaluation order (fixed)
    pub const ALL: [Section; 6] = [
        Section::StoreProfile,
        Section::Payments,
        Section::OpeningHours,
        Section::Menu,
        Section::Delivery,
        Section::Finance,
    ];

    /// Human-readable label shown in the dashboard (pt-BR)
    pub fn label(&self) -> &'static str {
        match self {
            Section::StoreProfile => "Perfil da loja",
            Section::Payments => "Formas de pagamento",
            Section::OpeningHours => "Horário de funcionamento",
            Section::Menu => "Cardápio",
            Section::Delivery => "Configurações de entrega",
            Section::Finance => "Financeiro",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
