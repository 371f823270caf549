//! Test support: logging setup and in-memory ledger fixtures

use std::env;
use std::sync::Once;

use rusqlite::{params, Connection};
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{AgentId, ResourceId, Time};
use crate::infrastructure::SqliteLedger;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

const FIXTURE_SCHEMA: &str = "
    CREATE TABLE Resources (
        ID INTEGER NOT NULL,
        TimeCreated INTEGER NOT NULL,
        Quantity REAL NOT NULL,
        Parent1 INTEGER NOT NULL,
        Parent2 INTEGER NOT NULL
    );
    CREATE TABLE Transactions (
        ID INTEGER NOT NULL,
        SenderID INTEGER NOT NULL,
        ReceiverID INTEGER NOT NULL,
        Time INTEGER NOT NULL
    );
    CREATE TABLE TransactedResources (
        TransactionID INTEGER NOT NULL,
        ResourceID INTEGER NOT NULL
    );
    CREATE TABLE SimulationTimeInfo (
        SimulationStart INTEGER NOT NULL,
        Duration INTEGER NOT NULL
    );
    CREATE TABLE Agents (
        ID INTEGER NOT NULL
    );
";

/// Builder for small simulation ledgers with the output database layout.
///
/// Panics on SQL errors; meant for tests only.
pub struct LedgerFixture {
    conn: Connection,
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerFixture {
    /// Empty in-memory ledger with all tables created.
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory ledger");
        Self::with_connection(conn)
    }

    /// Create the ledger tables on an existing connection (e.g. a file).
    pub fn with_connection(conn: Connection) -> Self {
        conn.execute_batch(FIXTURE_SCHEMA)
            .expect("create ledger tables");
        Self { conn }
    }

    pub fn simulation(self, start: Time, duration: Time) -> Self {
        self.conn
            .execute(
                "INSERT INTO SimulationTimeInfo (SimulationStart, Duration) VALUES (?1, ?2)",
                params![start, duration],
            )
            .expect("insert time info");
        self
    }

    pub fn agent(self, id: AgentId) -> Self {
        self.conn
            .execute("INSERT INTO Agents (ID) VALUES (?1)", params![id])
            .expect("insert agent");
        self
    }

    pub fn resource(
        self,
        id: ResourceId,
        parent_1: ResourceId,
        parent_2: ResourceId,
        time: Time,
        quantity: f64,
    ) -> Self {
        self.conn
            .execute(
                "INSERT INTO Resources (ID, TimeCreated, Quantity, Parent1, Parent2)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, time, quantity, parent_1, parent_2],
            )
            .expect("insert resource");
        self
    }

    /// Record transaction `id` moving `resources` from `sender` to `receiver`.
    pub fn transfer(
        self,
        id: i64,
        time: Time,
        sender: AgentId,
        receiver: AgentId,
        resources: &[ResourceId],
    ) -> Self {
        self.conn
            .execute(
                "INSERT INTO Transactions (ID, SenderID, ReceiverID, Time) VALUES (?1, ?2, ?3, ?4)",
                params![id, sender, receiver, time],
            )
            .expect("insert transaction");
        for resource in resources {
            self.conn
                .execute(
                    "INSERT INTO TransactedResources (TransactionID, ResourceID) VALUES (?1, ?2)",
                    params![id, resource],
                )
                .expect("insert transacted resource");
        }
        self
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    pub fn into_ledger(self) -> SqliteLedger {
        SqliteLedger::from_connection(self.conn)
    }
}
