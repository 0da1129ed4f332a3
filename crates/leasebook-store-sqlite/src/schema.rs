//! SQL schema for the Leasebook SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Read-only from the status machinery's point of view.
CREATE TABLE IF NOT EXISTS contracts (
    contract_id   TEXT PRIMARY KEY,
    start_date    TEXT NOT NULL,   -- YYYY-MM-DD
    end_date      TEXT NOT NULL,   -- YYYY-MM-DD
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    property_ref  TEXT,
    tenant_ref    TEXT,
    monthly_rent  TEXT,
    deposit       TEXT,
    note          TEXT,
    CHECK (end_date >= start_date)
);

-- One row per status interval, [valid_from, valid_to).
-- `seq` is the append order; same-day transitions share a valid_from.
CREATE TABLE IF NOT EXISTS status_intervals (
    contract_id TEXT    NOT NULL REFERENCES contracts(contract_id),
    seq         INTEGER NOT NULL,
    status      TEXT    NOT NULL,   -- 'active' | 'expired' | 'terminated'
    valid_from  TEXT    NOT NULL,
    valid_to    TEXT,               -- NULL while open
    PRIMARY KEY (contract_id, seq),
    CHECK (valid_to IS NULL OR valid_to >= valid_from),
    CHECK (status IN ('active', 'expired', 'terminated'))
);

-- At most one open interval per contract.
CREATE UNIQUE INDEX IF NOT EXISTS status_intervals_one_open
    ON status_intervals(contract_id) WHERE valid_to IS NULL;

CREATE INDEX IF NOT EXISTS contracts_end_idx ON contracts(end_date);

-- Intervals are never deleted.
CREATE TRIGGER IF NOT EXISTS status_intervals_no_delete
BEFORE DELETE ON status_intervals
BEGIN
    SELECT RAISE(ABORT, 'status intervals are append-only');
END;

-- Only an open interval's valid_to may be written, and only once.
CREATE TRIGGER IF NOT EXISTS status_intervals_close_once
BEFORE UPDATE ON status_intervals
WHEN OLD.valid_to IS NOT NULL
  OR NEW.valid_to IS NULL
  OR NEW.contract_id != OLD.contract_id
  OR NEW.seq         != OLD.seq
  OR NEW.status      != OLD.status
  OR NEW.valid_from  != OLD.valid_from
BEGIN
    SELECT RAISE(ABORT, 'closed status intervals are immutable');
END;

PRAGMA user_version = 1;
";
