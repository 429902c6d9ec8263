//! Seeds the doctor directory and prints bearer tokens for local testing.
//!
//! Uses the same `DQ_DATABASE_URL` / `DQ_TOKEN_SECRET` as the server.

use std::env;

use anyhow::Context;
use dq_auth_simple::SimpleAuthProvider;
use dq_core::models::{Doctor, Identity};
use dq_core::traits::DoctorDirectory;
use dq_db_sqlite::SqliteQuestionRepo;
use uuid::Uuid;

const DOCTORS: &[(&str, Option<&str>)] = &[
    ("Dr. Ada Hart", Some("General Practice")),
    ("Dr. Omar Reyes", Some("Dermatology")),
    ("Dr. Lin Okafor", None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url =
        env::var("DQ_DATABASE_URL").unwrap_or_else(|_| "sqlite:doctor_questions.db".into());
    let secret = env::var("DQ_TOKEN_SECRET").context("DQ_TOKEN_SECRET must be set")?;
    let ttl_minutes: i64 = match env::var("DQ_TOKEN_TTL_MINUTES") {
        Ok(raw) => raw.trim().parse().context("invalid DQ_TOKEN_TTL_MINUTES")?,
        Err(_) => 120,
    };
    let ttl = chrono::Duration::minutes(ttl_minutes);

    let repo = SqliteQuestionRepo::new(&database_url).await?;
    let tokens = SimpleAuthProvider::new(&secret);

    // Re-running keeps existing ids so previously issued tokens stay valid.
    let existing = repo.list_doctors().await?;

    for (name, specialization) in DOCTORS {
        let id = existing
            .iter()
            .find(|d| d.display_name == *name)
            .map(|d| d.id)
            .unwrap_or_else(Uuid::now_v7);
        let doctor = Doctor {
            id,
            display_name: name.to_string(),
            specialization: specialization.map(str::to_string),
            active: true,
        };
        repo.upsert_doctor(&doctor).await?;
        let token = tokens.issue_token(Identity::doctor(doctor.id), ttl)?;
        println!("doctor  {} ({})\n  token: {token}", doctor.display_name, doctor.id);
    }

    let patient = Identity::patient(Uuid::now_v7());
    let token = tokens.issue_token(patient, ttl)?;
    println!("patient {}\n  token: {token}", patient.user_id);

    log::info!("seeded {} doctors into {database_url}", DOCTORS.len());
    Ok(())
}
