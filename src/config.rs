//! Engine configuration.
//!
//! `EngineConfig` is built once (defaults, or a TOML file) and handed to
//! `StatementProcessor::new`; nothing mutates it afterwards, so a single
//! processor can be shared by every worker in a batch.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StatementError;

pub const FALLBACK_CATEGORY: &str = "Outros";

/// One row of the keyword table: a description containing any keyword
/// (case-insensitive) gets `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gap below which the statement-level reconciler does nothing
    pub reconcile_tolerance: Decimal,
    /// Residual gap still accepted as OK
    pub validation_tolerance: Decimal,
    /// Distance from the declared total that marks an item on a total line as
    /// the total itself
    pub total_line_tolerance: Decimal,
    pub block_epsilon: Decimal,
    pub duplicate_tolerance: Decimal,
    /// Leading pages searched for summary charges and credits
    pub summary_pages: usize,
    pub max_candidates: usize,
    pub max_subset_size: usize,
    /// Ordered; first matching rule wins
    pub categories: Vec<CategoryRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_tolerance: Decimal::new(5, 2),
            validation_tolerance: Decimal::new(50, 2),
            total_line_tolerance: Decimal::new(100, 2),
            block_epsilon: Decimal::new(1, 3),
            duplicate_tolerance: Decimal::new(1, 2),
            summary_pages: 3,
            max_candidates: 12,
            max_subset_size: 4,
            categories: default_categories(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| StatementError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Explicit path if given, else `<config_home>/fatura/config.toml` when it
    /// exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), StatementError> {
        let tolerances = [
            ("reconcile_tolerance", self.reconcile_tolerance),
            ("validation_tolerance", self.validation_tolerance),
            ("total_line_tolerance", self.total_line_tolerance),
            ("block_epsilon", self.block_epsilon),
            ("duplicate_tolerance", self.duplicate_tolerance),
        ];
        for (name, value) in tolerances {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(StatementError::Config(format!(
                    "{} must not be negative (got {})",
                    name, value
                )));
            }
        }
        if self.summary_pages == 0 {
            return Err(StatementError::Config("summary_pages must be at least 1".into()));
        }
        if self.max_subset_size == 0 || self.max_candidates == 0 {
            return Err(StatementError::Config(
                "max_candidates and max_subset_size must be at least 1".into(),
            ));
        }
        if let Some(rule) = self.categories.iter().find(|r| r.name.trim().is_empty()) {
            return Err(StatementError::Config(format!(
                "category with keywords {:?} has an empty name",
                rule.keywords
            )));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("fatura").join("config.toml"))
}

pub fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Transporte",
            &[
                "UBER", "99POP", "99APP", "99RIDE", "99PAY", "METRO", "VELOE", "SEM PARAR",
                "POSTO", "SHELL", "IPIRANGA", "ESTACIONAMENTO", "LOCALIZA", "MOVIDA", "UNIDAS",
                "WHOOSH",
            ],
        ),
        CategoryRule::new(
            "Alimentação",
            &[
                "IFOOD", "IFD", "RAPPI", "UBER EATS", "BURGER", "MC DONALDS", "MCDONALDS",
                "OUTBACK", "RESTAURANTE", "PADARIA", "MERCADO", "SUPERMERCADO", "MUNDIAL",
                "ZONA SUL", "PAO DE ACUCAR", "PAODEACUCAR", "PDA", "MINUTO", "MINUTOPA", "ASSAI",
                "CARREFOUR", "EXTRA", "HORTIFRUTI", "BEBIDAS", "BAR", "BISTRO", "DOCES",
                "GIGANTE", "GRUPO FARTURA", "CONFIANCA", "SODEXO", "ZIG", "COLODEMAE",
                "SAMBADAROSA", "SKINA", "TORTA",
            ],
        ),
        CategoryRule::new(
            "Saúde",
            &[
                "DROGARIA", "FARMACIA", "RAIA", "PACHECO", "VENANCIO", "HOSPITAL", "CLINICA",
                "LABORATORIO", "CONSULTORIO", "RD SAUDE", "RDSAUDE", "VETERINARIO",
                "VETERINARIOSA", "WELLHUB", "GYMPASS", "SPORTCLUB",
            ],
        ),
        CategoryRule::new(
            "Serviços/Assinaturas",
            &[
                "NETFLIX", "SPOTIFY", "AMAZON PRIME", "CLARO", "VIVO", "TIM", "OI", "INTERNET",
                "TV", "APPLE", "GOOGLE", "CLUBE", "LIVELO", "YELUM", "SEGURADORA", "SEGURO",
                "KEYDROP",
            ],
        ),
        CategoryRule::new(
            "Compras",
            &[
                "AMAZON", "MERCADO LIVRE", "MELI", "MAGALU", "SHOPEE", "ALIEXPRESS", "SHEIN",
                "ZARA", "RENNER", "C&A", "RIACHUELO", "DECATHLON", "CENTAURO", "NETSHOES", "VANS",
                "VIVARA", "FAST SHOP", "FASTSHOP", "AZEVEDO", "LUIS FELIPPE", "LUISFELIPPE",
                "COMPRA DE PONTOS", "AQUINO", "OUTLET", "MODA",
            ],
        ),
        CategoryRule::new(
            "Viagem",
            &[
                "HOTEL", "AIRBNB", "BOOKING", "CVC", "LATAM", "GOL", "AZUL", "PASSAGEM", "IBIS",
                "INGRESSE",
            ],
        ),
        CategoryRule::new(
            "Financeiro",
            &["IOF", "ENCARGOS", "MULTA", "JUROS", "ANUIDADE"],
        ),
    ]
}
