//! SQL schema for the Safario SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id    TEXT PRIMARY KEY,
    email         TEXT UNIQUE COLLATE NOCASE,
    phone_number  TEXT UNIQUE,
    password_hash TEXT,             -- argon2 PHC string; NULL for OTP-only accounts
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS otp_challenges (
    phone_number TEXT PRIMARY KEY,
    code_hash    TEXT NOT NULL,
    expires_at   TEXT NOT NULL,
    attempts     INTEGER NOT NULL DEFAULT 0
);

-- Exactly one role row per account drives access control.
CREATE TABLE IF NOT EXISTS user_roles (
    user_id     TEXT PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    role        TEXT NOT NULL,      -- 'user' | 'authority' | 'admin'
    role_status TEXT NOT NULL,      -- 'pending' | 'approved' | 'rejected'
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    user_id            TEXT PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    full_name          TEXT NOT NULL,
    date_of_birth      TEXT NOT NULL,   -- YYYY-MM-DD
    gender             TEXT NOT NULL,
    passport_number    TEXT,
    aadhaar_number     TEXT,
    preferred_language TEXT NOT NULL,
    photo_url          TEXT,
    phone_number       TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS emergency_alerts (
    alert_id       TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES accounts(account_id),
    location_lat   REAL NOT NULL,
    location_lng   REAL NOT NULL,
    alert_type     TEXT NOT NULL,
    status         TEXT NOT NULL,   -- 'active' | 'resolved'
    responder_id   TEXT,
    response_notes TEXT,
    responded_at   TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS fir_reports (
    fir_id        TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL REFERENCES accounts(account_id),
    fir_number    TEXT NOT NULL UNIQUE,
    incident_type TEXT NOT NULL,
    description   TEXT NOT NULL,
    location_lat  REAL NOT NULL,
    location_lng  REAL NOT NULL,
    status        TEXT NOT NULL,    -- 'filed' | 'investigating' | 'closed'
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lost_items (
    item_id      TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES accounts(account_id),
    item_name    TEXT NOT NULL,
    description  TEXT NOT NULL,
    image_url    TEXT,
    location_lat REAL,
    location_lng REAL,
    status       TEXT NOT NULL,     -- 'lost' | 'found'
    found_at     TEXT,
    fir_id       TEXT REFERENCES fir_reports(fir_id),
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS emergency_contacts (
    contact_id   TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    relationship TEXT NOT NULL,
    phone        TEXT NOT NULL,
    email        TEXT,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_account_idx ON sessions(account_id);
CREATE INDEX IF NOT EXISTS alerts_user_idx      ON emergency_alerts(user_id, created_at);
CREATE INDEX IF NOT EXISTS firs_user_idx        ON fir_reports(user_id, created_at);
CREATE INDEX IF NOT EXISTS lost_items_user_idx  ON lost_items(user_id, created_at);
CREATE INDEX IF NOT EXISTS contacts_user_idx    ON emergency_contacts(user_id);

PRAGMA user_version = 1;
";
