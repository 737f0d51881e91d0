pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,      -- argon2id hash with embedded salt
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; every token belongs to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,         -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,       -- first 8 chars of ID for fast lookup
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,

    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                  -- NULL = never
    last_used_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);

-- Categories are seeded once and read-mostly afterward
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    description TEXT,
    price REAL NOT NULL,
    stock INTEGER NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 0,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    -- Soft delete: a non-null value hides the row from normal queries
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_products_category_id ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_products_deleted_at ON products(deleted_at);
"#;
