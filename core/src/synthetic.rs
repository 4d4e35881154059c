//! Deterministic synthetic portfolio generation.
//!
//! Produces advisors, registry links and policy rows that look like a real
//! broker extract: mixed identifier encodings, Spanish-locale premiums,
//! duplicate movement rows and a few entities that never resolve.
//! Same seed = same dataset, byte for byte.

use crate::{
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
    rng::{StreamRng, StreamSlot},
};
use chrono::{Datelike, Duration, NaiveDate};

const FIRST_NAMES: &[&str] = &[
    "Lucía", "Hugo", "Martina", "Mateo", "Sofía", "Leo", "Julia", "Daniel",
    "Paula", "Álvaro", "Carmen", "Pablo", "Elena", "Manuel", "Irene", "Javier",
];

const LAST_NAMES: &[&str] = &[
    "García", "Fernández", "López", "Martínez", "Sánchez", "Pérez", "Gómez", "Ruiz",
    "Díaz", "Moreno", "Álvarez", "Romero", "Navarro", "Torres", "Ramos", "Gil",
];

const ENTITY_PREFIXES: &[&str] = &[
    "Correduría", "Agencia", "Gestoría", "Asesoría", "Grupo", "Seguros",
];

const ENTITY_PLACES: &[&str] = &[
    "Norte", "Levante", "Atlántico", "Meseta", "Ribera", "Sierra", "Mediterráneo",
    "Cantábrico", "del Valle", "Centro",
];

const ENTITY_SUFFIXES: &[&str] = &["SL", "SA", "SLU", "& Asociados", ""];

/// (product name, typical annual premium)
const PRODUCTS: &[(&str, f64)] = &[
    ("AUTO TODO RIESGO", 480.0),
    ("AUTO TERCEROS AMPLIADO", 310.0),
    ("MOTO BASICO", 190.0),
    ("HOGAR CONFORT", 220.0),
    ("HOGAR PREMIUM", 340.0),
    ("SALUD ASISTENCIA SANITARIA", 690.0),
    ("DENTAL FAMILIAR", 150.0),
    ("VIDA RIESGO", 260.0),
    ("DECESOS INDIVIDUAL", 120.0),
    ("ACCIDENTES PERSONALES", 95.0),
    ("COMERCIO MULTIRRIESGO", 820.0),
    ("RESPONSABILIDAD CIVIL PROFESIONAL", 540.0),
    ("PLAN AHORRO PIAS", 1200.0),
    ("COMUNIDAD DE PROPIETARIOS", 1450.0),
];

const COMPANIES: &[&str] = &["MAP", "ALL", "AXA", "GEN", "MUT", "ZUR"];
const PAYMENT_METHODS: &[&str] = &["Anual", "Semestral", "Trimestral", "Mensual"];
const ACTIVE_STATUSES: &[&str] = &["En Vigor", "En Vigor", "En Vigor", "Pendiente de cobro", "Cartera"];
const CANCELLED_STATUSES: &[&str] = &["Anulada", "Baja"];
const OTHER_STATUSES: &[&str] = &["Propuesta", "Emitida"];
const CANCELLATION_REASONS: &[&str] = &[
    "Precio", "Impago", "Venta del bien", "Cambio de compañía", "Fallecimiento", "",
];

#[derive(Debug, Clone)]
pub struct SyntheticParams {
    pub seed:      u64,
    pub advisors:  usize,
    pub entities:  usize,
    /// Latest date any generated event may carry.
    pub reference: NaiveDate,
}

impl SyntheticParams {
    pub fn new(seed: u64, entities: usize, reference: NaiveDate) -> Self {
        Self {
            seed,
            advisors: (entities / 12).clamp(2, 40),
            entities,
            reference,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntheticPortfolio {
    pub policies: Vec<PolicyRecord>,
    pub links:    Vec<RegistryLink>,
    pub advisors: Vec<AdvisorRecord>,
}

fn format_premium(amount: f64) -> String {
    format!("{amount:.2}").replace('.', ",")
}

fn advisor_name(rng: &mut StreamRng, index: usize) -> String {
    let first = rng.pick(FIRST_NAMES);
    let last = rng.pick(LAST_NAMES);
    // Index suffix keeps names unique for large advisor counts.
    if index < FIRST_NAMES.len() {
        format!("{first} {last}")
    } else {
        format!("{first} {last} {index}")
    }
}

fn entity_name(rng: &mut StreamRng) -> String {
    let prefix = rng.pick(ENTITY_PREFIXES);
    let place = rng.pick(ENTITY_PLACES);
    let suffix = rng.pick(ENTITY_SUFFIXES);
    if suffix.is_empty() {
        format!("{prefix} {place}")
    } else {
        format!("{prefix} {place} {suffix}")
    }
}

pub fn generate(params: &SyntheticParams) -> SyntheticPortfolio {
    let mut advisor_rng = StreamRng::new(params.seed, StreamSlot::Advisors);
    let mut entity_rng = StreamRng::new(params.seed, StreamSlot::Entities);
    let mut policy_rng = StreamRng::new(params.seed, StreamSlot::Policies);
    let mut noise_rng = StreamRng::new(params.seed, StreamSlot::Noise);

    let advisors: Vec<AdvisorRecord> = (0..params.advisors.max(1))
        .map(|i| AdvisorRecord { name: advisor_name(&mut advisor_rng, i) })
        .collect();

    let mut portfolio = SyntheticPortfolio { advisors, ..Default::default() };
    let mut policy_seq = 0u64;

    for i in 0..params.entities {
        let code = format!("{:05}", 100 + i);
        let name = entity_name(&mut entity_rng);
        let advisor = entity_rng.pick(&portfolio.advisors).name.clone();

        let identifier = if entity_rng.chance(0.7) {
            format!("{name} - {code}")
        } else {
            code.clone()
        };
        portfolio.links.push(RegistryLink { advisor_name: advisor, entity_identifier: identifier });

        // A small share of entities never made it into the registry.
        let unregistered = noise_rng.chance(0.04);
        let policy_count = (policy_rng.pareto(1.0, 1.6).floor() as usize).clamp(1, 9);

        for _ in 0..policy_count {
            policy_seq += 1;
            let (product, base_premium) = *policy_rng.pick(PRODUCTS);
            let age_days = policy_rng.range_inclusive(0, 8 * 365);
            let effective = params.reference - Duration::days(age_days);

            let roll = policy_rng.next_f64();
            let (status, cancelled_on, reason) = if roll < 0.16 {
                let span = policy_rng.range_inclusive(30, 1500);
                let cancelled = (effective + Duration::days(span)).min(params.reference);
                (
                    *policy_rng.pick(CANCELLED_STATUSES),
                    cancelled.format("%Y-%m-%d").to_string(),
                    policy_rng.pick(CANCELLATION_REASONS).to_string(),
                )
            } else if roll < 0.96 {
                (*policy_rng.pick(ACTIVE_STATUSES), String::new(), String::new())
            } else {
                (*policy_rng.pick(OTHER_STATUSES), String::new(), String::new())
            };

            let premium = base_premium * policy_rng.pareto(0.6, 3.0);
            let (entity_text, entity_code) = if unregistered {
                (format!("{name} - 9{code}"), String::new())
            } else if noise_rng.chance(0.1) {
                (name.clone(), code.clone())
            } else {
                (format!("{name} - {code}"), String::new())
            };

            let record = PolicyRecord {
                policy_number:       format!("P{policy_seq:07}"),
                entity_text,
                entity_code,
                product_name:        product.to_string(),
                company:             policy_rng.pick(COMPANIES).to_string(),
                premium:             format_premium(premium),
                effective_date:      effective.format("%d/%m/%Y").to_string(),
                cancellation_date:   cancelled_on,
                cancellation_reason: reason,
                status:              status.to_string(),
                payment_method:      policy_rng.pick(PAYMENT_METHODS).to_string(),
                production_year:     effective.year().to_string(),
                production_month:    format!("{:02}", effective.month()),
            };

            // Movement rows: an earlier "in force" copy of the same policy.
            if noise_rng.chance(0.06) {
                let mut movement = record.clone();
                movement.status = "En Vigor".into();
                movement.cancellation_date.clear();
                movement.cancellation_reason.clear();
                portfolio.policies.push(movement);
            }
            portfolio.policies.push(record);
        }
    }

    log::debug!(
        "synthetic: seed={} -> {} policies, {} links, {} advisors",
        params.seed, portfolio.policies.len(), portfolio.links.len(), portfolio.advisors.len(),
    );
    portfolio
}
