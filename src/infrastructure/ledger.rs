//! SQLite-backed resource ledger

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, instrument};

use crate::domain::{
    AgentId, ResourceId, ResourceRecord, SimulationWindow, TransferRecord, NO_PARENT,
};
use crate::infrastructure::traits::{LedgerError, LedgerResult, ResourceLedger};

const INDEX_STATEMENTS: &str = "
    CREATE INDEX IF NOT EXISTS res_par1 ON Resources (Parent1 ASC);
    CREATE INDEX IF NOT EXISTS res_par2 ON Resources (Parent2 ASC);
    CREATE INDEX IF NOT EXISTS trans_sender ON Transactions (SenderID ASC);
    CREATE INDEX IF NOT EXISTS trans_receiver ON Transactions (ReceiverID ASC);
    CREATE INDEX IF NOT EXISTS transres_transid ON TransactedResources (TransactionID ASC);
";

const PARENTLESS_SQL: &str = "
    SELECT ID, Parent1, Parent2, TimeCreated, Quantity FROM Resources
    WHERE Parent1 = ?1 AND Parent2 = ?1
    ORDER BY ID ASC
";

const CHILDREN_SQL: &str = "
    SELECT ID, Parent1, Parent2, TimeCreated, Quantity FROM Resources
    WHERE Parent1 = ?1 OR Parent2 = ?1
    ORDER BY ID ASC
";

const TRANSFERS_SQL: &str = "
    SELECT tr.Time, tr.SenderID, tr.ReceiverID, trr.ResourceID, res.Quantity
    FROM Transactions AS tr
    INNER JOIN TransactedResources AS trr ON tr.ID = trr.TransactionID
    INNER JOIN Resources AS res ON trr.ResourceID = res.ID
    WHERE tr.SenderID = ?1 OR tr.ReceiverID = ?1
    ORDER BY tr.Time ASC, tr.ID ASC
";

const TIME_INFO_SQL: &str = "SELECT SimulationStart, Duration FROM SimulationTimeInfo";

const AGENTS_SQL: &str = "SELECT ID FROM Agents ORDER BY ID ASC";

/// Ledger stored in a simulation output database.
pub struct SqliteLedger {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteLedger {
    /// Open an existing ledger file. A missing file is an error, not a new database.
    #[instrument(level = "debug")]
    pub fn open(path: &Path) -> LedgerResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| LedgerError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("opened ledger {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already open connection (e.g. an in-memory database).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn, path: None }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn resource_rows(
        &self,
        sql: &str,
        id: ResourceId,
        context: &str,
    ) -> LedgerResult<Vec<ResourceRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| LedgerError::query(context, e))?;
        let rows = stmt
            .query_map(params![id], resource_from_row)
            .map_err(|e| LedgerError::query(context, e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::query(context, e))
    }
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceRecord> {
    Ok(ResourceRecord {
        id: row.get(0)?,
        parent_1: row.get(1)?,
        parent_2: row.get(2)?,
        time_created: row.get(3)?,
        quantity: row.get(4)?,
    })
}

fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<TransferRecord> {
    Ok(TransferRecord {
        time: row.get(0)?,
        sender: row.get(1)?,
        receiver: row.get(2)?,
        resource_id: row.get(3)?,
        quantity: row.get(4)?,
    })
}

impl ResourceLedger for SqliteLedger {
    #[instrument(level = "debug", skip(self))]
    fn prepare(&self) -> LedgerResult<()> {
        self.conn
            .execute_batch(INDEX_STATEMENTS)
            .map_err(|e| LedgerError::query("create lookup indexes", e))
    }

    #[instrument(level = "debug", skip(self))]
    fn parentless_resources(&self) -> LedgerResult<Vec<ResourceRecord>> {
        self.resource_rows(PARENTLESS_SQL, NO_PARENT, "select parentless resources")
    }

    #[instrument(level = "trace", skip(self))]
    fn children_of(&self, id: ResourceId) -> LedgerResult<Vec<ResourceRecord>> {
        self.resource_rows(
            CHILDREN_SQL,
            id,
            &format!("select children of resource {}", id),
        )
    }

    #[instrument(level = "debug", skip(self))]
    fn transfers_involving(&self, agent: AgentId) -> LedgerResult<Vec<TransferRecord>> {
        let context = format!("select transfers of agent {}", agent);
        let mut stmt = self
            .conn
            .prepare_cached(TRANSFERS_SQL)
            .map_err(|e| LedgerError::query(&context, e))?;
        let rows = stmt
            .query_map(params![agent], transfer_from_row)
            .map_err(|e| LedgerError::query(&context, e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::query(&context, e))
    }

    #[instrument(level = "debug", skip(self))]
    fn simulation_window(&self) -> LedgerResult<SimulationWindow> {
        self.conn
            .query_row(TIME_INFO_SQL, [], |row| {
                Ok(SimulationWindow::new(row.get(0)?, row.get(1)?))
            })
            .optional()
            .map_err(|e| LedgerError::query("select simulation time info", e))?
            .ok_or(LedgerError::MissingTimeInfo)
    }

    #[instrument(level = "debug", skip(self))]
    fn agents(&self) -> LedgerResult<Vec<AgentId>> {
        let mut stmt = self
            .conn
            .prepare_cached(AGENTS_SQL)
            .map_err(|e| LedgerError::query("select agents", e))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| LedgerError::query("select agents", e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::query("select agents", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::LedgerFixture;

    fn fixture() -> SqliteLedger {
        LedgerFixture::new()
            .simulation(0, 12)
            .agent(5)
            .agent(6)
            .resource(1, 0, 0, 0, 10.0)
            .resource(2, 1, 0, 5, 4.0)
            .resource(3, 0, 1, 5, 6.0)
            .resource(4, 0, 0, 2, 1.0)
            .transfer(1, 2, 6, 5, &[4])
            .transfer(2, 8, 5, 6, &[2])
            .into_ledger()
    }

    #[test]
    fn prepare_is_idempotent() {
        let ledger = fixture();
        ledger.prepare().unwrap();
        ledger.prepare().unwrap();
        let count: i64 = ledger
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'res_par%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn parentless_resources_are_roots_of_the_ledger() {
        let ids: Vec<_> = fixture()
            .parentless_resources()
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn children_match_either_parent_column() {
        let children = fixture().children_of(1).unwrap();
        let ids: Vec<_> = children.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(children[1].parent_2, 1);
    }

    #[test]
    fn transfers_join_quantity_and_sort_by_time() {
        let transfers = fixture().transfers_involving(5).unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].resource_id, 4);
        assert_eq!(transfers[0].receiver, 5);
        assert_eq!(transfers[0].quantity, 1.0);
        assert_eq!(transfers[1].sender, 5);
        assert_eq!(transfers[1].time, 8);
    }

    #[test]
    fn unknown_agent_has_no_transfers() {
        assert!(fixture().transfers_involving(99).unwrap().is_empty());
    }

    #[test]
    fn window_and_agents() {
        let ledger = fixture();
        assert_eq!(
            ledger.simulation_window().unwrap(),
            SimulationWindow::new(0, 12)
        );
        assert_eq!(ledger.agents().unwrap(), vec![5, 6]);
    }

    #[test]
    fn missing_time_info_is_reported() {
        let ledger = LedgerFixture::new().into_ledger();
        assert!(matches!(
            ledger.simulation_window(),
            Err(LedgerError::MissingTimeInfo)
        ));
    }

    #[test]
    fn missing_tables_surface_as_query_errors() {
        let ledger = SqliteLedger::from_connection(Connection::open_in_memory().unwrap());
        let err = ledger.children_of(1).unwrap_err();
        assert!(err.to_string().contains("children of resource 1"));
    }

    #[test]
    fn opening_a_missing_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = SqliteLedger::open(&dir.path().join("absent.sqlite")).unwrap_err();
        assert!(matches!(err, LedgerError::Open { .. }));
    }
}
