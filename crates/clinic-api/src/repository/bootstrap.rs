//! 스키마 초기화 및 시드 데이터.
//!
//! 서버 시작 시 스키마를 멱등하게 생성하고 고정 역할 집합을 시드합니다.
//! 샘플 데이터 시드는 데모/개발용으로 선택적으로 실행됩니다.

use sqlx::PgPool;

use clinic_core::{ClinicResult, Role};

use super::db_err;
use crate::auth::hash_password;
use clinic_core::ClinicError;

/// 스키마 생성 스크립트. 모든 문장이 멱등합니다.
///
/// `uq_dentist_slot` 부분 유니크 인덱스가 슬롯 유일성의 유일한
/// 동시성 가드입니다. 취소된 예약은 슬롯을 점유하지 않습니다.
const SCHEMA_SQL: &str = r#"
DO $$ BEGIN
    CREATE TYPE appointment_status AS ENUM ('BOOKED', 'CANCELLED', 'COMPLETED');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS addresses (
    id BIGSERIAL PRIMARY KEY,
    street VARCHAR(120) NOT NULL,
    city VARCHAR(60) NOT NULL,
    state VARCHAR(30) NOT NULL,
    zip_code VARCHAR(15) NOT NULL
);

CREATE TABLE IF NOT EXISTS surgeries (
    id BIGSERIAL PRIMARY KEY,
    surgery_no VARCHAR(10) NOT NULL UNIQUE,
    name VARCHAR(120) NOT NULL,
    phone VARCHAR(30),
    address_id BIGINT UNIQUE REFERENCES addresses(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS roles (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(40) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(60) NOT NULL UNIQUE,
    email VARCHAR(120) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    enabled BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, role_id)
);

CREATE SEQUENCE IF NOT EXISTS patient_no_seq;

CREATE TABLE IF NOT EXISTS patients (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
    patient_no VARCHAR(20) NOT NULL UNIQUE
        DEFAULT ('P' || lpad(nextval('patient_no_seq')::TEXT, 4, '0')),
    first_name VARCHAR(60) NOT NULL,
    last_name VARCHAR(60) NOT NULL,
    phone VARCHAR(30),
    email VARCHAR(120),
    address_id BIGINT REFERENCES addresses(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS dentists (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
    first_name VARCHAR(60) NOT NULL,
    last_name VARCHAR(60) NOT NULL,
    phone VARCHAR(30),
    email VARCHAR(120),
    specialization VARCHAR(80),
    surgery_id BIGINT REFERENCES surgeries(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id BIGSERIAL PRIMARY KEY,
    appointment_date DATE NOT NULL,
    appointment_time TIME NOT NULL,
    status appointment_status NOT NULL DEFAULT 'BOOKED',
    patient_id BIGINT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    dentist_id BIGINT NOT NULL REFERENCES dentists(id) ON DELETE CASCADE,
    surgery_id BIGINT NOT NULL REFERENCES surgeries(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_dentist_slot
    ON appointments (dentist_id, appointment_date, appointment_time)
    WHERE status <> 'CANCELLED';
"#;

/// 스키마를 생성합니다 (존재하면 그대로 둡니다).
pub async fn init_schema(pool: &PgPool) -> ClinicResult<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(db_err)?;

    tracing::info!("Database schema initialized");
    Ok(())
}

/// 고정 역할 집합(ADMIN/DENTIST/PATIENT)을 시드합니다.
///
/// 역할은 시드 이후 불변이며 런타임에 새로 만들어지지 않습니다.
pub async fn seed_roles(pool: &PgPool) -> ClinicResult<()> {
    for role in Role::ALL {
        sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(role.as_str())
            .execute(pool)
            .await
            .map_err(db_err)?;
    }

    Ok(())
}

/// 데모용 샘플 데이터를 시드합니다.
///
/// 지점이 하나라도 있으면 아무 것도 하지 않습니다. 전체 시드는 하나의
/// 트랜잭션으로 수행됩니다.
pub async fn seed_sample_data(pool: &PgPool) -> ClinicResult<()> {
    let surgeries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM surgeries")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;
    if surgeries > 0 {
        tracing::debug!("Sample data already present, skipping seed");
        return Ok(());
    }

    let mut tx = pool.begin().await.map_err(db_err)?;

    let addresses = [
        ("123 West Avenue", "Phoenix", "AZ", "85012"),
        ("900 Johns Street", "Cleveland", "OH", "43098"),
        ("45 Green Street", "Dallas", "TX", "75201"),
    ];
    let mut address_ids = Vec::new();
    for (street, city, state, zip_code) in addresses {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO addresses (street, city, state, zip_code) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(street)
        .bind(city)
        .bind(state)
        .bind(zip_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        address_ids.push(id);
    }

    let surgeries = [
        ("S001", "Bells Court Dental", "602-555-1234", address_ids[0]),
        ("S002", "The Galleria Surgery", "216-555-5678", address_ids[1]),
        ("S003", "Pearl Dental South", "214-555-9012", address_ids[2]),
    ];
    let mut surgery_ids = Vec::new();
    for (surgery_no, name, phone, address_id) in surgeries {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO surgeries (surgery_no, name, phone, address_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(surgery_no)
        .bind(name)
        .bind(phone)
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        surgery_ids.push(id);
    }

    let users = [
        ("admin", "admin@ads.com", "adminpass", Role::Admin),
        ("tsmith", "tsmith@ads.com", "dentistpass", Role::Dentist),
        ("hpearson", "hpearson@ads.com", "dentistpass", Role::Dentist),
        ("rplevin", "rplevin@ads.com", "dentistpass", Role::Dentist),
        ("gwhite", "gwhite@mail.com", "patientpass", Role::Patient),
        ("jbell", "jbell@mail.com", "patientpass", Role::Patient),
        ("ianm", "ianm@mail.com", "patientpass", Role::Patient),
        ("jwalker", "jwalker@mail.com", "patientpass", Role::Patient),
    ];
    let mut user_ids = Vec::new();
    for (username, email, password, role) in users {
        let password_hash = hash_password(password)
            .map_err(|e| ClinicError::Internal(e.to_string()))?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        user_ids.push(id);
    }

    let dentists = [
        (user_ids[1], "Tony", "Smith", "General", "480-123-1111", "tsmith@ads.com", surgery_ids[0]),
        (user_ids[2], "Helen", "Pearson", "Orthodontics", "480-123-2222", "hpearson@ads.com", surgery_ids[1]),
        (user_ids[3], "Robin", "Plevin", "Pediatric", "480-123-3333", "rplevin@ads.com", surgery_ids[2]),
    ];
    let mut dentist_ids = Vec::new();
    for (user_id, first_name, last_name, specialization, phone, email, surgery_id) in dentists {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO dentists
                (user_id, first_name, last_name, specialization, phone, email, surgery_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(specialization)
        .bind(phone)
        .bind(email)
        .bind(surgery_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        dentist_ids.push(id);
    }

    let patients = [
        (user_ids[4], "P001", "Gillian", "White", "gwhite@mail.com", address_ids[0]),
        (user_ids[5], "P002", "Jill", "Bell", "jbell@mail.com", address_ids[0]),
        (user_ids[6], "P003", "Ian", "MacKay", "ianm@mail.com", address_ids[1]),
        (user_ids[7], "P004", "John", "Walker", "jwalker@mail.com", address_ids[2]),
    ];
    let mut patient_ids = Vec::new();
    for (user_id, patient_no, first_name, last_name, email, address_id) in patients {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO patients
                (user_id, patient_no, first_name, last_name, email, address_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(patient_no)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        patient_ids.push(id);
    }

    let appointments = [
        ((2013, 9, 12), (9, 0), patient_ids[0], dentist_ids[0], surgery_ids[0]),
        ((2013, 9, 12), (10, 0), patient_ids[1], dentist_ids[0], surgery_ids[0]),
        ((2013, 9, 13), (11, 0), patient_ids[2], dentist_ids[1], surgery_ids[1]),
        ((2013, 9, 14), (12, 0), patient_ids[2], dentist_ids[1], surgery_ids[1]),
        ((2013, 9, 14), (13, 0), patient_ids[1], dentist_ids[2], surgery_ids[2]),
        ((2013, 9, 15), (14, 0), patient_ids[3], dentist_ids[2], surgery_ids[2]),
    ];
    for ((year, month, day), (hour, minute), patient_id, dentist_id, surgery_id) in appointments {
        let date = chrono::NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| ClinicError::Internal("invalid seed date".to_string()))?;
        let time = chrono::NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| ClinicError::Internal("invalid seed time".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO appointments
                (appointment_date, appointment_time, patient_id, dentist_id, surgery_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(date)
        .bind(time)
        .bind(patient_id)
        .bind(dentist_id)
        .bind(surgery_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
    }

    tx.commit().await.map_err(db_err)?;

    tracing::info!("Sample data seeded");
    Ok(())
}
