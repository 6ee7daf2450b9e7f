//! Quantity datatype: a number with a unit of measurement.
//!
//! Values normalize to the base unit of a [`UnitTable`], so `5 km` and
//! `5000 m` produce the same key-vector `[5000, "m"]` and therefore the same
//! hash. The unit the user wrote is kept for display; the output format hint
//! can name a different display unit.
//!
//! Unit tables are configuration: hosts load them from TOML via
//! [`UnitTable::from_toml`], e.g.
//!
//! ```toml
//! base = "m"
//!
//! [factors]
//! mm = 0.001
//! cm = 0.01
//! m = 1.0
//! km = 1000.0
//! ```

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{
    datatype::{Datatype, ParseCx},
    error::OnticError,
    properties::Scalar,
};

static METRIC_LENGTH: Lazy<UnitTable> = Lazy::new(|| {
    UnitTable::from_toml(
        r#"
        base = "m"

        [factors]
        mm = 0.001
        cm = 0.01
        m = 1.0
        km = 1000.0
        "#,
    )
    .expect("built-in unit table is well-formed")
});

/// A family of convertible units: one base unit plus multiplication factors
/// into the base.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitTable {
    base: String,
    factors: BTreeMap<String, f64>,
}

impl UnitTable {
    /// Load a unit table from its TOML form. The base unit is implied to
    /// have factor 1.0 if the factor table omits it; factors must be finite
    /// and positive.
    pub fn from_toml(source: &str) -> Result<Self, OnticError> {
        let mut table: UnitTable = toml::from_str(source)?;
        table.factors.entry(table.base.clone()).or_insert(1.0);
        if let Some((unit, factor)) = table
            .factors
            .iter()
            .find(|(_, factor)| !factor.is_finite() || **factor <= 0.0)
        {
            return Err(OnticError::Serialization(format!(
                "Unit '{unit}' has non-positive factor {factor}"
            )));
        }
        Ok(table)
    }

    /// The built-in metric length table (mm/cm/m/km over base `m`).
    pub fn metric_length() -> Self {
        METRIC_LENGTH.clone()
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn factor(&self, unit: &str) -> Option<f64> {
        self.factors.get(unit).copied()
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        UnitTable::metric_length()
    }
}

/// Split `5 km` / `0.5km` / `-2e3 m` into the numeric prefix and the unit
/// remainder. Thousands separators in the number part are tolerated.
fn split_amount(raw: &str) -> (String, String) {
    let trimmed = raw.trim();
    let boundary = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ',' | 'e' | 'E')))
        .map(|(index, _)| index)
        .unwrap_or(trimmed.len());
    let number = trimmed[..boundary].replace(',', "");
    let unit = trimmed[boundary..].trim().to_string();
    (number, unit)
}

/// A number with a unit, normalized to the base unit of its table.
#[derive(Debug, Clone)]
pub struct QuantityValue {
    units: UnitTable,
    /// Amount in the base unit.
    amount: Option<f64>,
    /// The unit the value was entered in; restored values display in base.
    display_unit: Option<String>,
}

impl Default for QuantityValue {
    fn default() -> Self {
        QuantityValue::with_units(UnitTable::default())
    }
}

impl QuantityValue {
    pub fn with_units(units: UnitTable) -> Self {
        QuantityValue {
            units,
            amount: None,
            display_unit: None,
        }
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    /// Render `amount` (base units) in `unit`. Falls back to the base unit
    /// when `unit` is not in the table.
    fn render_in(&self, amount: f64, unit: &str) -> String {
        let (unit, factor) = match self.units.factor(unit) {
            Some(factor) => (unit, factor),
            None => (self.units.base(), 1.0),
        };
        format!("{} {unit}", Scalar::Float(amount / factor).render())
    }

    /// The unit to display in, honoring the output format hint first, then
    /// the unit the value was entered with, then the base.
    fn preferred_unit<'a>(&'a self, output_format: Option<&'a str>) -> &'a str {
        if let Some(requested) = output_format.map(str::trim).filter(|s| !s.is_empty()) {
            if self.units.factor(requested).is_some() {
                return requested;
            }
            tracing::debug!(
                "[QuantityValue] Output format '{requested}' is not a known unit, ignoring"
            );
        }
        self.display_unit.as_deref().unwrap_or(self.units.base())
    }
}

impl Datatype for QuantityValue {
    fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>) {
        let (number, unit) = split_amount(raw);
        let Ok(value) = number.parse::<f64>() else {
            cx.error("value-bad-number", &[raw.trim().to_string()]);
            return;
        };
        let unit = if unit.is_empty() {
            self.units.base().to_string()
        } else {
            unit
        };
        let Some(factor) = self.units.factor(&unit) else {
            cx.error("value-bad-unit", &[unit]);
            return;
        };
        cx.propose_caption(raw.trim());
        self.amount = Some(value * factor);
        self.display_unit = Some(unit);
    }

    fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>) {
        let Some(amount) = keys.first().and_then(Scalar::as_number) else {
            cx.error("value-malformed-keys", &[]);
            return;
        };
        // A one-entry vector is a bare number in the base unit. A present
        // second entry must name a unit from the table; the amount is then
        // interpreted in that unit.
        let factor = match keys.get(1) {
            None => 1.0,
            Some(scalar) => {
                let unit = scalar.render();
                match self.units.factor(&unit) {
                    Some(factor) => factor,
                    None => {
                        cx.error("value-bad-unit", &[unit]);
                        return;
                    }
                }
            }
        };
        self.amount = Some(amount * factor);
        self.display_unit = None;
    }

    fn db_keys(&self) -> Vec<Scalar> {
        vec![
            Scalar::Float(self.amount.unwrap_or_default()),
            Scalar::Text(self.units.base().to_string()),
        ]
    }

    fn wiki_value(&self) -> Option<String> {
        let amount = self.amount?;
        let unit = self.display_unit.as_deref().unwrap_or(self.units.base());
        Some(self.render_in(amount, unit))
    }

    fn display_label(&self, output_format: Option<&str>) -> String {
        match self.amount {
            Some(amount) => self.render_in(amount, self.preferred_unit(output_format)),
            None => String::new(),
        }
    }

    fn long_label(&self, output_format: Option<&str>) -> String {
        let Some(amount) = self.amount else {
            return String::new();
        };
        let preferred = self.preferred_unit(output_format);
        let shown = self.render_in(amount, preferred);
        if preferred == self.units.base() {
            shown
        } else {
            // Detail displays carry the normalized form alongside.
            format!("{shown} ({})", self.render_in(amount, self.units.base()))
        }
    }

    fn numeric_value(&self) -> Option<f64> {
        self.amount
    }

    fn is_numeric(&self) -> bool {
        true
    }

    fn service_link_params(&self) -> Option<Vec<String>> {
        let amount = self.amount?;
        Some(vec![
            Scalar::Float(amount).render(),
            self.units.base().to_string(),
        ])
    }
}
