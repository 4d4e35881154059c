//! SQLite-backed record store.
//!
//! RULE: only this file talks to the database. Rows come back in insertion
//! order (by rowid) because deduplication depends on source order.

use super::RecordStore;
use crate::{
    error::AnalyticsResult,
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
};
use rusqlite::{params, Connection};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the record database at `path`.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_records.sql"))?;
        Ok(())
    }

    // ── Writes ─────────────────────────────────────────────────

    pub fn insert_policy(&self, p: &PolicyRecord) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO policy_record (
                policy_number, entity_text, entity_code, product_name, company,
                premium, effective_date, cancellation_date, cancellation_reason,
                status, payment_method, production_year, production_month
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                p.policy_number,
                p.entity_text,
                p.entity_code,
                p.product_name,
                p.company,
                p.premium,
                p.effective_date,
                p.cancellation_date,
                p.cancellation_reason,
                p.status,
                p.payment_method,
                p.production_year,
                p.production_month,
            ],
        )?;
        Ok(())
    }

    pub fn insert_registry_link(&self, link: &RegistryLink) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO registry_link (advisor_name, entity_identifier) VALUES (?1, ?2)",
            params![link.advisor_name, link.entity_identifier],
        )?;
        Ok(())
    }

    pub fn insert_advisor(&self, advisor: &AdvisorRecord) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO advisor (name) VALUES (?1)",
            params![advisor.name],
        )?;
        Ok(())
    }

    /// Bulk load all three datasets in one transaction.
    pub fn import(
        &self,
        policies: &[PolicyRecord],
        links:    &[RegistryLink],
        advisors: &[AdvisorRecord],
    ) -> AnalyticsResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for advisor in advisors {
            self.insert_advisor(advisor)?;
        }
        for link in links {
            self.insert_registry_link(link)?;
        }
        for policy in policies {
            self.insert_policy(policy)?;
        }
        tx.commit()?;
        log::info!(
            "store: imported {} policies, {} links, {} advisors",
            policies.len(), links.len(), advisors.len(),
        );
        Ok(())
    }

    pub fn policy_count(&self) -> AnalyticsResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM policy_record",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl RecordStore for SqliteStore {
    fn fetch_policies(&self) -> AnalyticsResult<Vec<PolicyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT policy_number, entity_text, entity_code, product_name, company,
                    premium, effective_date, cancellation_date, cancellation_reason,
                    status, payment_method, production_year, production_month
             FROM policy_record ORDER BY id ASC"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PolicyRecord {
                policy_number:       row.get(0)?,
                entity_text:         row.get(1)?,
                entity_code:         row.get(2)?,
                product_name:        row.get(3)?,
                company:             row.get(4)?,
                premium:             row.get(5)?,
                effective_date:      row.get(6)?,
                cancellation_date:   row.get(7)?,
                cancellation_reason: row.get(8)?,
                status:              row.get(9)?,
                payment_method:      row.get(10)?,
                production_year:     row.get(11)?,
                production_month:    row.get(12)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_registry_links(&self) -> AnalyticsResult<Vec<RegistryLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT advisor_name, entity_identifier FROM registry_link ORDER BY id ASC"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RegistryLink {
                advisor_name:      row.get(0)?,
                entity_identifier: row.get(1)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_advisors(&self) -> AnalyticsResult<Vec<AdvisorRecord>> {
        let mut stmt = self.conn.prepare("SELECT name FROM advisor ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| Ok(AdvisorRecord { name: row.get(0)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
