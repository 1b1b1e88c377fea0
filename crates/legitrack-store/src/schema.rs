//! Table definitions.
//!
//! Two schemas: `camara` holds data mirrored from the Chamber API, keyed by
//! the remote ids; `usuarios` holds local accounts. Surrogate keys come from
//! sequences. Referential integrity between the two link tables and their
//! parents is enforced by the writer, not by foreign keys.

use duckdb::Connection;

use crate::StoreError;

const DDL: &str = "
CREATE SCHEMA IF NOT EXISTS camara;
CREATE SCHEMA IF NOT EXISTS usuarios;

CREATE TABLE IF NOT EXISTS camara.tp_situacao (
    id_situacao BIGINT PRIMARY KEY,
    ds_situacao VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS camara.tp_tramitacao (
    id_tramitacao BIGINT PRIMARY KEY,
    ds_tramitacao VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS camara.tp_temas (
    id_tema BIGINT PRIMARY KEY,
    ds_tema VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS camara.tb_projeto (
    id_projeto BIGINT PRIMARY KEY,
    titulo_projeto VARCHAR,
    descricao VARCHAR,
    ano_inicio INTEGER,
    data_hora TIMESTAMP,
    sigla_orgao VARCHAR,
    despacho VARCHAR,
    id_ultima_situacao BIGINT,
    id_ultima_tramitacao BIGINT
);

CREATE SEQUENCE IF NOT EXISTS camara.seq_rl_tramitacoes START 1;
CREATE TABLE IF NOT EXISTS camara.rl_tramitacoes (
    id_rl_tramitacao BIGINT PRIMARY KEY DEFAULT nextval('camara.seq_rl_tramitacoes'),
    id_projeto BIGINT NOT NULL,
    sequencia BIGINT NOT NULL,
    data_hora TIMESTAMP NOT NULL,
    sigla_orgao VARCHAR,
    despacho VARCHAR,
    id_situacao BIGINT,
    id_tramitacao BIGINT,
    UNIQUE (id_projeto, sequencia)
);

CREATE SEQUENCE IF NOT EXISTS camara.seq_rl_temas START 1;
CREATE TABLE IF NOT EXISTS camara.rl_temas (
    id_rl_temas BIGINT PRIMARY KEY DEFAULT nextval('camara.seq_rl_temas'),
    id_projeto BIGINT NOT NULL,
    id_tema BIGINT NOT NULL,
    UNIQUE (id_projeto, id_tema)
);

CREATE SEQUENCE IF NOT EXISTS usuarios.seq_users START 1;
CREATE TABLE IF NOT EXISTS usuarios.users (
    id BIGINT PRIMARY KEY DEFAULT nextval('usuarios.seq_users'),
    username VARCHAR(150) NOT NULL UNIQUE,
    email VARCHAR(150) NOT NULL UNIQUE,
    password_hash VARCHAR(256) NOT NULL,
    criado_em TIMESTAMP
);

CREATE TABLE IF NOT EXISTS usuarios.tokens (
    token_hash VARCHAR PRIMARY KEY,
    user_id BIGINT NOT NULL,
    expires_at TIMESTAMP NOT NULL,
    created_at TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS usuarios.interesses (
    user_id BIGINT NOT NULL,
    id_tema BIGINT NOT NULL
);
";

/// Every table created by [`apply`], fully qualified.
pub const TABLES: &[&str] = &[
    "camara.tp_situacao",
    "camara.tp_tramitacao",
    "camara.tp_temas",
    "camara.tb_projeto",
    "camara.rl_tramitacoes",
    "camara.rl_temas",
    "usuarios.users",
    "usuarios.tokens",
    "usuarios.interesses",
];

/// Create schemas, sequences and tables that do not exist yet. Idempotent.
pub fn apply(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(DDL)?;
    Ok(())
}
