//! Product → category ("ramo") classification.
//!
//! RULE: rules are evaluated top to bottom and the first match wins.
//! The order is part of the contract: "SEGURO DE VIDA HOGAR" is VIDA,
//! "DECESOS VIDA" is DECESOS. Never reorder without a migration note.

pub const FALLBACK_CATEGORY: &str = "OTROS";

const RULES: &[(&[&str], &str)] = &[
    (&["DECES"], "DECESOS"),
    (&["VIDA"], "VIDA"),
    (&["SALUD", "SANIT", "MEDIC", "DENTAL", "ASISTENCIA SANITARIA"], "SALUD"),
    (&["ACCIDENT"], "ACCIDENTES"),
    (&["COMUNIDAD"], "COMUNIDADES"),
    (&["HOGAR", "VIVIENDA", "CASA"], "HOGAR"),
    (&["AUTO", "COCHE", "MOTO", "VEHIC", "FLOTA"], "AUTOS"),
    (&["COMERCIO", "PYME", "NEGOCIO", "EMPRESA", "INDUSTRIA"], "EMPRESAS"),
    (&["RESPONSABILIDAD", "R.C.", "RC "], "RESPONSABILIDAD CIVIL"),
    (&["AHORRO", "PENSION", "PIAS", "JUBILACION", "INVERSION"], "AHORRO"),
    (&["MASCOTA"], "MASCOTAS"),
];

/// Classify a free-text product name. Pure: no state, no allocation beyond
/// the upper-cased copy.
pub fn classify(product_name: &str) -> &'static str {
    let upper = product_name.to_uppercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| upper.contains(*n)))
        .map(|(_, category)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}
