//! Seed script for development: populates a database with a demo workspace
//! and prints bearer tokens for each demo user.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` and `JWT_SECRET` environment variables (reads .env).
//! Task dates are relative to today, so re-running on a later day shifts
//! nothing already inserted; drop the database to regenerate.

use anyhow::Context;
use chrono::{Days, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use work_time_hero::config::AppConfig;
use work_time_hero::models::task::{TaskPriority, TaskStatus};
use work_time_hero::models::user::UserRole;
use work_time_hero::models::workspace::WorkspaceRole;
use work_time_hero::{db, services::auth};

const TASKS_PER_PROJECT: u128 = 48;

struct DemoUser {
    id: Uuid,
    email: &'static str,
    name: &'static str,
    role: UserRole,
}

const fn id(n: u128) -> Uuid {
    Uuid::from_u128(0x7e57_0000_0000_0000_0000_0000_0000_0000 | n)
}

const USERS: [DemoUser; 5] = [
    DemoUser {
        id: id(0x01),
        email: "admin@worktimehero.local",
        name: "Platform Admin",
        role: UserRole::Admin,
    },
    DemoUser {
        id: id(0x02),
        email: "olivia@worktimehero.local",
        name: "Olivia Owner",
        role: UserRole::User,
    },
    DemoUser {
        id: id(0x03),
        email: "mark@worktimehero.local",
        name: "Mark Member",
        role: UserRole::User,
    },
    DemoUser {
        id: id(0x04),
        email: "dana@worktimehero.local",
        name: "Dana Designer",
        role: UserRole::User,
    },
    DemoUser {
        id: id(0x05),
        email: "vic@worktimehero.local",
        name: "Vic Viewer",
        role: UserRole::User,
    },
];

const WORKSPACE: Uuid = id(0x100);
const DEPT_ENGINEERING: Uuid = id(0x200);
const DEPT_DESIGN: Uuid = id(0x201);
const PROJECTS: [(Uuid, &str, bool); 3] = [
    (id(0x300), "Website Relaunch", false),
    (id(0x301), "Mobile App", false),
    (id(0x302), "Legacy Portal", true),
];
const TAGS: [(Uuid, &str, &str); 3] = [
    (id(0x400), "bug", "#e5484d"),
    (id(0x401), "feature", "#30a46c"),
    (id(0x402), "chore", "#8e8c99"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("DATABASE_URL and JWT_SECRET must be set")?;
    let pool = db::create_pool(&config.database_url, 5).await?;
    db::run_migrations(&pool).await?;

    println!("=== Work Time Hero Seed Script ===");

    seed_users(&pool).await?;
    seed_workspace(&pool).await?;
    seed_tasks(&pool, Utc::now().date_naive()).await?;

    println!("\n=== Seed complete! ===");
    println!("Workspace: {WORKSPACE}");
    for (project_id, name, _) in PROJECTS {
        println!("Project {name}: {project_id}");
    }
    println!("\nBearer tokens (valid {}s):", config.jwt_access_token_expiry_secs);
    for user in &USERS {
        let token = auth::issue_access_token(
            user.id,
            user.email,
            user.role,
            &config.jwt_secret,
            config.jwt_access_token_expiry_secs,
        )?;
        println!("  {} <{}>\n    {token}", user.name, user.email);
    }

    Ok(())
}

async fn seed_users(pool: &PgPool) -> anyhow::Result<()> {
    for user in &USERS {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, platform_role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user.id)
        .bind(user.email)
        .bind(user.name)
        .bind(user.role)
        .execute(pool)
        .await?;
    }
    println!("[done] Users");
    Ok(())
}

async fn seed_workspace(pool: &PgPool) -> anyhow::Result<()> {
    let owner = USERS[1].id;
    sqlx::query(
        "INSERT INTO workspaces (id, name, owner_id) VALUES ($1, 'Acme Studio', $2)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(WORKSPACE)
    .bind(owner)
    .execute(pool)
    .await?;

    for (dept, name) in [(DEPT_ENGINEERING, "Engineering"), (DEPT_DESIGN, "Design")] {
        sqlx::query(
            "INSERT INTO departments (id, workspace_id, name) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(dept)
        .bind(WORKSPACE)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let members = [
        (USERS[1].id, WorkspaceRole::Owner, Some(DEPT_ENGINEERING)),
        (USERS[2].id, WorkspaceRole::Member, Some(DEPT_ENGINEERING)),
        (USERS[3].id, WorkspaceRole::Member, Some(DEPT_DESIGN)),
        (USERS[4].id, WorkspaceRole::Viewer, None),
    ];
    for (user_id, role, department) in members {
        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role, department_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (workspace_id, user_id) DO NOTHING",
        )
        .bind(WORKSPACE)
        .bind(user_id)
        .bind(role)
        .bind(department)
        .execute(pool)
        .await?;
    }

    for (project_id, name, archived) in PROJECTS {
        sqlx::query(
            "INSERT INTO projects (id, workspace_id, name, archived) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(project_id)
        .bind(WORKSPACE)
        .bind(name)
        .bind(archived)
        .execute(pool)
        .await?;

        for user in &USERS[1..4] {
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(project_id)
            .bind(user.id)
            .execute(pool)
            .await?;
        }
    }

    for (tag_id, name, color) in TAGS {
        sqlx::query(
            "INSERT INTO tags (id, workspace_id, name, color) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(tag_id)
        .bind(WORKSPACE)
        .bind(name)
        .bind(color)
        .execute(pool)
        .await?;
    }

    println!("[done] Workspace, departments, projects and tags");
    Ok(())
}

/// Spread tasks over the last ~90 days with a deterministic mix of
/// statuses, priorities, assignees and deadlines.
async fn seed_tasks(pool: &PgPool, today: NaiveDate) -> anyhow::Result<()> {
    let assignees = [Some(USERS[1].id), Some(USERS[2].id), Some(USERS[3].id), None];
    let priorities = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];
    let mut inserted = 0u64;

    for (p, (project_id, project_name, _)) in PROJECTS.iter().enumerate() {
        for n in 0..TASKS_PER_PROJECT {
            let seq = (p as u128) * TASKS_PER_PROJECT + n;
            let task_id = id(0x1_0000 + seq);
            let k = seq as usize;

            let age = (k * 7 % 90) as u64;
            let created_day = today.checked_sub_days(Days::new(age)).unwrap_or(today);
            let created_at = created_day
                .and_hms_opt(9 + (k % 8) as u32, 0, 0)
                .unwrap_or_default()
                .and_utc();
            let due_date = (k % 5 != 0).then(|| created_day + Days::new(3 + (k % 10) as u64));

            // Roughly half done, some late, the rest spread over open states.
            let (status, completed_at) = match k % 6 {
                0 | 1 | 2 => {
                    let lag = Duration::days((k % 12) as i64);
                    let done_at = (created_at + lag).min(Utc::now());
                    (TaskStatus::Done, Some(done_at))
                }
                3 => (TaskStatus::InProgress, None),
                4 => (TaskStatus::InReview, None),
                _ => (TaskStatus::Todo, None),
            };

            let result = sqlx::query(
                "INSERT INTO tasks
                    (id, project_id, title, status, priority, assignee_id,
                     created_at, due_date, completed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(task_id)
            .bind(project_id)
            .bind(format!("{project_name} task {}", n + 1))
            .bind(status)
            .bind(priorities[k % priorities.len()])
            .bind(assignees[k % assignees.len()])
            .bind(created_at)
            .bind(due_date)
            .bind(completed_at)
            .execute(pool)
            .await?;
            inserted += result.rows_affected();

            let (tag_id, _, _) = TAGS[k % TAGS.len()];
            sqlx::query(
                "INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(task_id)
            .bind(tag_id)
            .execute(pool)
            .await?;
        }
    }

    if inserted == 0 {
        println!("[skip] Tasks already exist");
    } else {
        println!("[done] Created {inserted} tasks");
    }
    Ok(())
}
